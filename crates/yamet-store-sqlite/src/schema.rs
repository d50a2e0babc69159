//! SQL schema for the YAMET SQLite store.
//!
//! Executed on every open. Every statement is idempotent; `user_version`
//! records the layout so later migrations can branch on it.

/// Full schema DDL.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;
PRAGMA user_version = 1;

CREATE TABLE IF NOT EXISTS users (
    id            INTEGER PRIMARY KEY AUTOINCREMENT,
    name          TEXT NOT NULL,
    email         TEXT UNIQUE COLLATE NOCASE,
    phone         TEXT UNIQUE,
    role          TEXT NOT NULL,              -- SUPERADMIN | MANAJER | ADMIN | TERAPIS | ORANGTUA | MARKETING
    status        TEXT NOT NULL DEFAULT 'active',
    password_hash TEXT NOT NULL,              -- argon2 PHC string
    created_by    INTEGER REFERENCES users(id),
    created_at    TEXT NOT NULL,
    updated_at    TEXT NOT NULL
);

-- Bearer tokens are never stored; only their SHA-256 hex digest.
CREATE TABLE IF NOT EXISTS sessions (
    token_hash TEXT PRIMARY KEY,
    user_id    INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    created_at TEXT NOT NULL,
    expires_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS children (
    id                  INTEGER PRIMARY KEY AUTOINCREMENT,
    nomor_anak          TEXT NOT NULL UNIQUE,
    full_name           TEXT NOT NULL,
    nick_name           TEXT,
    jenis_kelamin       TEXT,
    birth_date          TEXT,
    birth_place         TEXT,
    kewarganegaraan     TEXT,
    agama               TEXT,
    anak_ke             INTEGER,
    sekolah_kelas       TEXT,
    status              TEXT NOT NULL DEFAULT 'AKTIF',
    tanggal_pemeriksaan TEXT,
    mulai_terapi        TEXT,
    selesai_terapi      TEXT,
    mulai_cuti          TEXT,
    created_by          INTEGER NOT NULL,
    updated_by          INTEGER,
    created_at          TEXT NOT NULL,
    updated_at          TEXT NOT NULL,
    deleted_at          TEXT,
    deleted_by          INTEGER
);

CREATE INDEX IF NOT EXISTS children_live ON children (deleted_at, created_at);

-- One-to-one intake sections other than the parents and attachments.
CREATE TABLE IF NOT EXISTS intake_sections (
    child_id   INTEGER NOT NULL REFERENCES children(id),
    relation   TEXT NOT NULL,                 -- e.g. survey_awal, pola_tidur
    data_json  TEXT NOT NULL,                 -- JSON object
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    PRIMARY KEY (child_id, relation)
);

-- Father and mother share one shape; each row belongs to exactly one side.
CREATE TABLE IF NOT EXISTS parents (
    id         INTEGER PRIMARY KEY AUTOINCREMENT,
    father_of  INTEGER UNIQUE REFERENCES children(id),
    mother_of  INTEGER UNIQUE REFERENCES children(id),
    data_json  TEXT NOT NULL,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    CHECK ((father_of IS NULL) != (mother_of IS NULL))
);

CREATE TABLE IF NOT EXISTS prior_examinations (
    id       INTEGER PRIMARY KEY AUTOINCREMENT,
    child_id INTEGER NOT NULL REFERENCES children(id),
    tempat   TEXT,
    usia     TEXT,
    diagnosa TEXT
);

CREATE TABLE IF NOT EXISTS prior_therapies (
    id           INTEGER PRIMARY KEY AUTOINCREMENT,
    child_id     INTEGER NOT NULL REFERENCES children(id),
    jenis_terapi TEXT,
    frekuensi    TEXT,
    lama_terapi  TEXT,
    tempat       TEXT
);

CREATE TABLE IF NOT EXISTS attachments (
    child_id                        INTEGER PRIMARY KEY REFERENCES children(id),
    hasil_eeg_url                   TEXT,
    hasil_bera_url                  TEXT,
    hasil_ct_scan_url               TEXT,
    program_terapi_3bln_url         TEXT,
    hasil_psikologis_psikiatris_url TEXT,
    perjanjian                      TEXT,
    keterangan_tambahan             TEXT,
    created_at                      TEXT NOT NULL,
    updated_at                      TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS assessments (
    id                INTEGER PRIMARY KEY AUTOINCREMENT,
    child_id          INTEGER NOT NULL REFERENCES children(id),
    assessment_date   TEXT NOT NULL,
    assessment_type   TEXT NOT NULL,
    assessment_result TEXT,
    notes             TEXT,
    created_by        INTEGER NOT NULL,
    created_at        TEXT NOT NULL,
    updated_at        TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS programs (
    id           INTEGER PRIMARY KEY AUTOINCREMENT,
    child_id     INTEGER NOT NULL REFERENCES children(id),
    program_name TEXT NOT NULL,
    description  TEXT,
    start_date   TEXT,
    end_date     TEXT,
    status       TEXT NOT NULL DEFAULT 'AKTIF',
    created_by   INTEGER NOT NULL,
    created_at   TEXT NOT NULL,
    updated_at   TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS therapy_sessions (
    id           INTEGER PRIMARY KEY AUTOINCREMENT,
    child_id     INTEGER NOT NULL REFERENCES children(id),
    program_id   INTEGER REFERENCES programs(id) ON DELETE SET NULL,
    therapist_id INTEGER REFERENCES users(id),
    tanggal_sesi TEXT NOT NULL,
    notes        TEXT,
    created_by   INTEGER NOT NULL,
    created_at   TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS notifications (
    id                  INTEGER PRIMARY KEY AUTOINCREMENT,
    jenis_pemberitahuan TEXT NOT NULL,        -- INFO | WARNING | SUCCESS | ERROR
    isi_notifikasi      TEXT NOT NULL,
    tujuan              TEXT NOT NULL,        -- ALL | ROLE:<role> | USER:<id> | bare name
    is_read             INTEGER NOT NULL DEFAULT 0,
    created_by          INTEGER NOT NULL,
    created_at          TEXT NOT NULL,
    updated_at          TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS conversions (
    id                 INTEGER PRIMARY KEY AUTOINCREMENT,
    bulan              TEXT NOT NULL,
    tahun              INTEGER NOT NULL,
    jumlah_leads       INTEGER NOT NULL DEFAULT 0,
    jumlah_conversi    INTEGER NOT NULL DEFAULT 0,
    jumlah_anak_keluar INTEGER NOT NULL DEFAULT 0,
    created_by         INTEGER NOT NULL,
    updated_by         INTEGER,
    created_at         TEXT NOT NULL,
    updated_at         TEXT NOT NULL,
    UNIQUE (bulan, tahun)
);

CREATE TABLE IF NOT EXISTS app_config (
    id           INTEGER PRIMARY KEY CHECK (id = 1),
    app_name     TEXT,
    logo_url     TEXT,
    color_schema TEXT
);
";
