//! End-to-end tests through the router against an in-memory store.

use axum::{
  body::{Body, to_bytes},
  http::{Request, StatusCode, header},
  response::Response,
};
use chrono::{Duration, Utc};
use serde_json::{Value, json};
use tempfile::TempDir;
use tower::ServiceExt as _;
use yamet_core::{
  store::Store,
  user::{NewUser, Role, User, UserStatus},
};
use yamet_store_sqlite::SqliteStore;

use super::*;
use crate::auth::{hash_password, issue_token};

const PASSWORD: &str = "rahasia123";
const PDF: &[u8] = b"%PDF-1.7\n%\xE2\xE3\xCF\xD3\n1 0 obj\n";

struct Fixture {
  state: AppState<SqliteStore>,
  dir:   TempDir,
}

impl Fixture {
  async fn new() -> Self {
    let dir    = TempDir::new().unwrap();
    let config = ServerConfig { upload_dir: dir.path().to_path_buf(), ..Default::default() };
    let store  = SqliteStore::open_in_memory().await.unwrap();
    Self { state: AppState::new(store, config), dir }
  }

  /// Like [`Fixture::new`] but backed by a database file that other
  /// connections can reach.
  async fn on_disk() -> Self {
    let dir    = TempDir::new().unwrap();
    let config = ServerConfig { upload_dir: dir.path().to_path_buf(), ..Default::default() };
    let store  = SqliteStore::open(dir.path().join("yamet.db")).await.unwrap();
    Self { state: AppState::new(store, config), dir }
  }

  async fn user(&self, email: &str, role: Role, status: UserStatus) -> User {
    self
      .state
      .store
      .create_user(NewUser {
        name: "Staff YAMET".into(),
        email: Some(email.into()),
        phone: None,
        role,
        status,
        password_hash: hash_password(PASSWORD).unwrap(),
        created_by: None,
      })
      .await
      .unwrap()
      .unwrap()
  }

  /// An active account of `role` and a live bearer token for it.
  async fn login_as(&self, role: Role) -> (User, String) {
    let email = format!("{}@yamet.id", role.as_ref().to_lowercase());
    let user  = self.user(&email, role, UserStatus::Active).await;
    let (token, digest) = issue_token();
    self
      .state
      .store
      .create_session(user.id, digest, Utc::now() + Duration::hours(1))
      .await
      .unwrap();
    (user, token)
  }

  async fn raw(&self, req: Request<Body>) -> Response { router(self.state.clone()).oneshot(req).await.unwrap() }

  async fn send(&self, method: &str, uri: &str, token: Option<&str>, body: Option<Value>) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
      builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    let req = match body {
      Some(body) => builder
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap(),
      None => builder.body(Body::empty()).unwrap(),
    };
    json_of(self.raw(req).await).await
  }

  async fn upload(&self, token: &str, child_id: i64, parts: &[(&str, &str, &[u8])]) -> (StatusCode, Value) {
    const BOUNDARY: &str = "yamet-test-boundary";
    let mut body = Vec::new();
    for (slot, file, bytes) in parts {
      body.extend_from_slice(
        format!(
          "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{slot}\"; filename=\"{file}\"\r\n\
           Content-Type: application/octet-stream\r\n\r\n"
        )
        .as_bytes(),
      );
      body.extend_from_slice(bytes);
      body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());

    let req = Request::builder()
      .method("POST")
      .uri(format!("/api/children/{child_id}/attachments"))
      .header(header::AUTHORIZATION, format!("Bearer {token}"))
      .header(header::CONTENT_TYPE, format!("multipart/form-data; boundary={BOUNDARY}"))
      .body(Body::from(body))
      .unwrap();
    json_of(self.raw(req).await).await
  }

  fn stored_files(&self) -> Vec<String> {
    match std::fs::read_dir(self.dir.path().join("lampiran")) {
      Ok(entries) => entries.map(|e| e.unwrap().file_name().to_string_lossy().into_owned()).collect(),
      Err(_) => Vec::new(),
    }
  }
}

async fn json_of(res: Response) -> (StatusCode, Value) {
  let status = res.status();
  let bytes  = to_bytes(res.into_body(), usize::MAX).await.unwrap();
  let body   = if bytes.is_empty() { Value::Null } else { serde_json::from_slice(&bytes).unwrap() };
  (status, body)
}

async fn new_child(fx: &Fixture, token: &str, name: &str) -> i64 {
  let (status, body) = fx.send("POST", "/api/children", Some(token), Some(json!({ "full_name": name }))).await;
  assert_eq!(status, StatusCode::CREATED, "{body}");
  body["data"]["anak"]["id"].as_i64().unwrap()
}

// ─── Health and accounts ─────────────────────────────────────────────────────

#[tokio::test]
async fn health_reports_database() {
  let fx = Fixture::new().await;
  let (status, body) = fx.send("GET", "/api/health", None, None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["status"], "healthy");
  assert_eq!(body["database"]["status"], "connected");
}

#[tokio::test]
async fn login_issues_a_working_token() {
  let fx = Fixture::new().await;
  fx.user("admin@yamet.id", Role::Admin, UserStatus::Active).await;

  let (status, body) = fx
    .send("POST", "/api/auth/login", None, Some(json!({ "email": "admin@yamet.id", "password": PASSWORD })))
    .await;
  assert_eq!(status, StatusCode::OK, "{body}");
  assert_eq!(body["message"], "Login berhasil");
  let token = body["data"]["token"].as_str().unwrap().to_owned();

  let (status, body) = fx.send("GET", "/api/auth/profile", Some(&token), None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["data"]["email"], "admin@yamet.id");

  let (status, _) = fx.send("POST", "/api/auth/logout", Some(&token), None).await;
  assert_eq!(status, StatusCode::OK);
  let (status, _) = fx.send("GET", "/api/auth/profile", Some(&token), None).await;
  assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn login_rejects_bad_password_and_inactive_accounts() {
  let fx = Fixture::new().await;
  fx.user("admin@yamet.id", Role::Admin, UserStatus::Active).await;
  fx.user("pending@yamet.id", Role::Parent, UserStatus::Pending).await;

  let (status, body) = fx
    .send("POST", "/api/auth/login", None, Some(json!({ "email": "admin@yamet.id", "password": "salah" })))
    .await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
  assert_eq!(body["message"], "Email/phone atau password salah");

  let (status, body) = fx
    .send("POST", "/api/auth/login", None, Some(json!({ "email": "pending@yamet.id", "password": PASSWORD })))
    .await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
  assert_eq!(body["message"], "Akun tidak aktif. Silakan hubungi admin.");
}

#[tokio::test]
async fn public_registration_is_a_pending_parent() {
  let fx = Fixture::new().await;
  let form = json!({ "name": "Ibu Sari", "email": "sari@mail.id", "password": "123456" });

  let (status, body) = fx.send("POST", "/api/auth/register", None, Some(form.clone())).await;
  assert_eq!(status, StatusCode::CREATED, "{body}");
  assert_eq!(body["data"]["peran"], "ORANGTUA");
  assert_eq!(body["data"]["status"], "pending");

  let (status, body) = fx.send("POST", "/api/auth/register", None, Some(form)).await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
  assert_eq!(body["message"], "Email atau phone sudah terdaftar");
}

#[tokio::test]
async fn admin_may_only_register_therapists() {
  let fx = Fixture::new().await;
  let (_, token) = fx.login_as(Role::Admin).await;

  let (status, _) = fx
    .send(
      "POST",
      "/api/auth/register",
      Some(&token),
      Some(json!({ "name": "Pak Manajer", "email": "m@yamet.id", "password": "123456", "peran": "MANAJER" })),
    )
    .await;
  assert_eq!(status, StatusCode::FORBIDDEN);

  let (status, body) = fx
    .send(
      "POST",
      "/api/auth/register",
      Some(&token),
      Some(json!({ "name": "Bu Terapis", "email": "t@yamet.id", "password": "123456", "peran": "TERAPIS" })),
    )
    .await;
  assert_eq!(status, StatusCode::CREATED);
  assert_eq!(body["data"]["status"], "active");
}

#[tokio::test]
async fn profile_update_replaces_the_login_password() {
  let fx = Fixture::new().await;
  let (_, token) = fx.login_as(Role::Admin).await;

  let (status, body) = fx
    .send("PUT", "/api/auth/update", Some(&token), Some(json!({ "name": "Admin Baru", "password": "baru12345" })))
    .await;
  assert_eq!(status, StatusCode::OK, "{body}");
  assert_eq!(body["message"], "User berhasil diupdate");
  assert_eq!(body["data"]["name"], "Admin Baru");

  let login = |password: &str| json!({ "email": "admin@yamet.id", "password": password });
  let (status, _) = fx.send("POST", "/api/auth/login", None, Some(login(PASSWORD))).await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
  let (status, _) = fx.send("POST", "/api/auth/login", None, Some(login("baru12345"))).await;
  assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn profile_update_refuses_a_taken_email() {
  let fx = Fixture::new().await;
  let (_, token) = fx.login_as(Role::Admin).await;
  fx.user("lain@yamet.id", Role::Parent, UserStatus::Active).await;

  let (status, body) = fx
    .send("PUT", "/api/auth/update", Some(&token), Some(json!({ "email": "lain@yamet.id" })))
    .await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
  assert_eq!(body["message"], "Email sudah digunakan oleh user lain");

  let (status, body) = fx
    .send("PUT", "/api/auth/update", Some(&token), Some(json!({ "password": "123" })))
    .await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
  assert_eq!(body["error_type"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn account_edits_follow_the_staff_hierarchy() {
  let fx = Fixture::new().await;
  let (_, admin) = fx.login_as(Role::Admin).await;
  let (_, root) = fx.login_as(Role::SuperAdmin).await;
  let (manager, _) = fx.login_as(Role::Manager).await;
  let therapist = fx.user("terapis@yamet.id", Role::Therapist, UserStatus::Active).await;

  let edit = |user: &User, extra: Value| {
    let mut body = json!({ "userId": user.id });
    body.as_object_mut().unwrap().extend(extra.as_object().unwrap().clone());
    body
  };

  let (status, _) = fx
    .send("PUT", "/api/auth/update-user", Some(&admin), Some(edit(&manager, json!({ "name": "Pak Manajer" }))))
    .await;
  assert_eq!(status, StatusCode::FORBIDDEN);

  let (status, body) = fx
    .send("PUT", "/api/auth/update-user", Some(&admin), Some(edit(&therapist, json!({ "name": "Bu Terapis" }))))
    .await;
  assert_eq!(status, StatusCode::OK, "{body}");
  assert_eq!(body["data"]["name"], "Bu Terapis");

  let (status, body) = fx
    .send("PUT", "/api/auth/update-user", Some(&admin), Some(edit(&therapist, json!({ "peran": "MANAJER" }))))
    .await;
  assert_eq!(status, StatusCode::FORBIDDEN);
  assert_eq!(body["message"], "Tidak memiliki izin untuk mengubah role user ini");

  let (status, body) = fx
    .send("PUT", "/api/auth/update-user", Some(&root), Some(edit(&therapist, json!({ "peran": "MANAJER" }))))
    .await;
  assert_eq!(status, StatusCode::OK, "{body}");
  assert_eq!(body["data"]["peran"], "MANAJER");
  assert_eq!(body["data"]["name"], "Bu Terapis");
}

// ─── Guards ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn missing_token_is_401_and_wrong_role_is_403() {
  let fx = Fixture::new().await;
  let (status, body) = fx.send("GET", "/api/children", None, None).await;
  assert_eq!(status, StatusCode::UNAUTHORIZED);
  assert_eq!(body["message"], "Akses ditolak. Token tidak valid.");

  let (_, parent) = fx.login_as(Role::Parent).await;
  let (status, _) = fx.send("GET", "/api/children", Some(&parent), None).await;
  assert_eq!(status, StatusCode::FORBIDDEN);

  let (_, therapist) = fx.login_as(Role::Therapist).await;
  let (status, _) = fx.send("GET", "/api/dashboard/stats", Some(&therapist), None).await;
  assert_eq!(status, StatusCode::FORBIDDEN);
  let (status, _) = fx.send("GET", "/api/marketing/dashboard", Some(&therapist), None).await;
  assert_eq!(status, StatusCode::FORBIDDEN);
}

// ─── Children ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn create_keeps_the_child_when_a_section_fails() {
  let fx = Fixture::new().await;
  let (_, token) = fx.login_as(Role::Admin).await;

  let (status, body) = fx
    .send(
      "POST",
      "/api/children",
      Some(&token),
      Some(json!({
        "full_name": "Rafa Pratama",
        "ayah": { "nama": "Budi" },
        "riwayat_kelahiran": { "jenis_kelahiran": "VAKUM" },
      })),
    )
    .await;
  assert_eq!(status, StatusCode::CREATED, "{body}");
  assert_eq!(body["data"]["failed"], 1);
  let relasi = body["data"]["relasi"].as_array().unwrap();
  let failed = relasi.iter().find(|r| r["status"] == "failed").unwrap();
  assert_eq!(failed["relasi"], "riwayat_kelahiran");
  assert!(!failed["error"].as_str().unwrap().is_empty());
  assert!(relasi.iter().any(|r| r["relasi"] == "ayah" && r["status"] == "success"));

  let id = body["data"]["anak"]["id"].as_i64().unwrap();
  let (status, _) = fx.send("GET", &format!("/api/children/{id}"), Some(&token), None).await;
  assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn malformed_top_level_fields_get_the_validation_envelope() {
  let fx = Fixture::new().await;
  let (_, token) = fx.login_as(Role::Admin).await;

  let (status, body) = fx
    .send("POST", "/api/children", Some(&token), Some(json!({ "full_name": "A", "ibu": "Siti" })))
    .await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
  assert_eq!(body["error_type"], "VALIDATION_ERROR");
  assert_eq!(body["total_errors"], 2);
}

#[tokio::test]
async fn failed_update_changes_nothing() {
  let fx = Fixture::new().await;
  let (_, token) = fx.login_as(Role::Admin).await;
  let id = new_child(&fx, &token, "Rafa Pratama").await;

  let (status, body) = fx
    .send(
      "PUT",
      &format!("/api/children/{id}"),
      Some(&token),
      Some(json!({ "full_name": "Nama Baru", "riwayat_kelahiran": { "jenis_kelahiran": "VAKUM" } })),
    )
    .await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
  assert_eq!(body["error_type"], "VALIDATION_ERROR");

  let (_, body) = fx.send("GET", &format!("/api/children/{id}"), Some(&token), None).await;
  assert_eq!(body["data"]["full_name"], "Rafa Pratama");
}

#[tokio::test]
async fn explicit_null_clears_the_nick_name() {
  let fx = Fixture::new().await;
  let (_, token) = fx.login_as(Role::Admin).await;
  let (status, body) = fx
    .send("POST", "/api/children", Some(&token), Some(json!({ "full_name": "Rafa Pratama", "nick_name": "Rafa" })))
    .await;
  assert_eq!(status, StatusCode::CREATED, "{body}");
  let id = body["data"]["anak"]["id"].as_i64().unwrap();

  let (status, body) = fx
    .send("PUT", &format!("/api/children/{id}"), Some(&token), Some(json!({ "nick_name": null })))
    .await;
  assert_eq!(status, StatusCode::OK, "{body}");

  let (_, body) = fx.send("GET", &format!("/api/children/{id}"), Some(&token), None).await;
  assert_eq!(body["data"]["nick_name"], Value::Null);
  assert_eq!(body["data"]["full_name"], "Rafa Pratama");
}

#[tokio::test]
async fn deleted_child_is_gone_from_reads() {
  let fx = Fixture::new().await;
  let (_, token) = fx.login_as(Role::SuperAdmin).await;
  let id = new_child(&fx, &token, "Rafa Pratama").await;

  let (status, _) = fx.send("DELETE", &format!("/api/children/{id}"), Some(&token), None).await;
  assert_eq!(status, StatusCode::OK);
  let (status, _) = fx.send("GET", &format!("/api/children/{id}"), Some(&token), None).await;
  assert_eq!(status, StatusCode::NOT_FOUND);
  let (_, body) = fx.send("GET", "/api/children", Some(&token), None).await;
  assert_eq!(body["pagination"]["total"], 0);
}

#[tokio::test]
async fn clinical_records_round_through_the_api() {
  let fx = Fixture::new().await;
  let (_, admin) = fx.login_as(Role::Admin).await;
  let (therapist, therapist_token) = fx.login_as(Role::Therapist).await;
  let id = new_child(&fx, &admin, "Rafa Pratama").await;

  let (status, body) = fx
    .send(
      "POST",
      &format!("/api/children/{id}/program-terapi"),
      Some(&admin),
      Some(json!({ "program_name": "Terapi Wicara", "start_date": "2025-01-06" })),
    )
    .await;
  assert_eq!(status, StatusCode::CREATED, "{body}");
  assert_eq!(body["data"]["status"], "AKTIF");
  let program_id = body["data"]["id"].as_i64().unwrap();

  let (status, body) = fx
    .send(
      "POST",
      &format!("/api/children/{id}/sessions"),
      Some(&therapist_token),
      Some(json!({ "tanggal_sesi": "2025-01-13", "program_id": program_id })),
    )
    .await;
  assert_eq!(status, StatusCode::CREATED, "{body}");
  assert_eq!(body["data"]["therapist_id"], therapist.id);

  let (status, _) = fx
    .send("DELETE", &format!("/api/children/{id}/program-terapi"), Some(&admin), None)
    .await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
  let (status, _) = fx
    .send("DELETE", &format!("/api/children/{id}/program-terapi?programId=9999"), Some(&admin), None)
    .await;
  assert_eq!(status, StatusCode::NOT_FOUND);
}

// ─── Conversions ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn duplicate_conversion_month_is_refused() {
  let fx = Fixture::new().await;
  let (_, token) = fx.login_as(Role::Admin).await;
  let row = json!({
    "bulan": "Januari",
    "tahun": 2025,
    "jumlah_leads": 40,
    "jumlah_conversi": 12,
    "jumlah_anak_keluar": 2,
  });

  let (status, _) = fx.send("POST", "/api/conversion", Some(&token), Some(row.clone())).await;
  assert_eq!(status, StatusCode::CREATED);
  let (status, body) = fx.send("POST", "/api/conversion", Some(&token), Some(row)).await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
  let message = body["message"].as_str().unwrap();
  assert!(message.contains("Januari") && message.contains("2025"), "{message}");
}

// ─── Attachments ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn refused_uploads_never_touch_the_disk() {
  let fx = Fixture::new().await;
  let (_, token) = fx.login_as(Role::Admin).await;
  let id = new_child(&fx, &token, "Rafa Pratama").await;

  let (status, _) = fx.upload(&token, id, &[("hasil_eeg_url", "catatan.txt", &b"hello"[..])]).await;
  assert_eq!(status, StatusCode::BAD_REQUEST);

  let mut big = PDF.to_vec();
  big.resize(6 * 1024 * 1024, 0);
  let (status, body) = fx
    .upload(&token, id, &[("perjanjian", "ok.pdf", PDF), ("hasil_bera_url", "besar.pdf", big.as_slice())])
    .await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
  assert!(body["message"].as_str().unwrap().contains("5MB"));

  assert!(fx.stored_files().is_empty());
}

#[tokio::test]
async fn failed_attachment_save_keeps_the_previous_file() {
  let fx = Fixture::on_disk().await;
  let (_, token) = fx.login_as(Role::Admin).await;
  let id = new_child(&fx, &token, "Rafa Pratama").await;

  let (status, body) = fx.upload(&token, id, &[("hasil_eeg_url", "eeg.pdf", PDF)]).await;
  assert_eq!(status, StatusCode::OK, "{body}");
  let before = fx.stored_files();
  assert_eq!(before.len(), 1);

  let db = rusqlite::Connection::open(fx.dir.path().join("yamet.db")).unwrap();
  db.execute_batch(
    "CREATE TRIGGER attachments_locked BEFORE UPDATE ON attachments
     BEGIN SELECT RAISE(ABORT, 'attachments locked'); END;
     CREATE TRIGGER attachments_insert_locked BEFORE INSERT ON attachments
     BEGIN SELECT RAISE(ABORT, 'attachments locked'); END;",
  )
  .unwrap();

  let (status, body) = fx.upload(&token, id, &[("hasil_eeg_url", "eeg-baru.pdf", PDF)]).await;
  assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
  assert!(!body["message"].as_str().unwrap().contains("locked"));
  assert_eq!(fx.stored_files(), before);

  let (status, body) = fx.send("GET", &format!("/api/children/{id}"), Some(&token), None).await;
  assert_eq!(status, StatusCode::OK);
  let url = body["data"]["lampiran"]["hasil_eeg_url"].as_str().unwrap();
  assert!(url.ends_with(&before[0]));
}

#[tokio::test]
async fn replacing_an_attachment_removes_the_old_file() {
  let fx = Fixture::new().await;
  let (_, token) = fx.login_as(Role::Admin).await;
  let id = new_child(&fx, &token, "Rafa Pratama").await;

  let (status, body) = fx.upload(&token, id, &[("hasil_eeg_url", "eeg lama.pdf", PDF)]).await;
  assert_eq!(status, StatusCode::OK, "{body}");
  let first = body["data"]["hasil_eeg_url"].as_str().unwrap().to_owned();
  assert!(first.starts_with("/uploads/lampiran/") && first.ends_with("-eeg_lama.pdf"));

  let (status, body) = fx.upload(&token, id, &[("hasil_eeg_url", "eeg-baru.pdf", PDF)]).await;
  assert_eq!(status, StatusCode::OK);
  let second = body["data"]["hasil_eeg_url"].as_str().unwrap().to_owned();
  let stored = second.rsplit('/').next().unwrap().to_owned();
  assert_eq!(fx.stored_files(), vec![stored.clone()]);

  let res = fx
    .raw(Request::builder().uri(format!("/api/lampiran/{stored}")).body(Body::empty()).unwrap())
    .await;
  assert_eq!(res.status(), StatusCode::OK);
  assert_eq!(res.headers()[header::CONTENT_TYPE], "application/pdf");
  assert_eq!(res.headers()[header::CONTENT_DISPOSITION], "attachment; filename=\"eeg-baru.pdf\"");

  let (status, body) = fx.upload(&token, id, &[("hasil_eeg_url", "", &b""[..])]).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["data"]["hasil_eeg_url"], Value::Null);
  assert!(fx.stored_files().is_empty());
}

#[tokio::test]
async fn download_refuses_path_tricks() {
  let fx = Fixture::new().await;
  let (status, body) = fx.send("GET", "/api/lampiran/..%2Fsecret.db", None, None).await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
  assert_eq!(body["message"], "Nama file tidak valid");

  let (status, _) = fx.send("GET", "/api/lampiran/a%5Cb.pdf", None, None).await;
  assert_eq!(status, StatusCode::BAD_REQUEST);

  let (status, body) = fx.send("GET", "/api/lampiran/1700000000000-tidak-ada.pdf", None, None).await;
  assert_eq!(status, StatusCode::NOT_FOUND);
  assert_eq!(body["message"], "File tidak ditemukan");
}

// ─── Notifications ───────────────────────────────────────────────────────────

#[tokio::test]
async fn users_see_only_what_is_addressed_to_them() {
  let fx = Fixture::new().await;
  let (_, admin) = fx.login_as(Role::SuperAdmin).await;
  let (therapist, token) = fx.login_as(Role::Therapist).await;

  let direct = format!("USER:{}", therapist.id);
  let mut ids = Vec::new();
  for tujuan in ["ALL", "ROLE:TERAPIS", "ROLE:ADMIN", direct.as_str()] {
    let (status, body) = fx
      .send(
        "POST",
        "/api/notifikasi",
        Some(&admin),
        Some(json!({ "jenis_pemberitahuan": "INFO", "isi_notifikasi": "Jadwal baru", "tujuan": tujuan })),
      )
      .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    ids.push(body["data"]["id"].as_i64().unwrap());
  }

  let (status, body) = fx.send("GET", "/api/notifikasi/user", Some(&token), None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["pagination"]["total"], 3);

  let (status, _) = fx.send("PUT", &format!("/api/notifikasi/user/{}", ids[2]), Some(&token), None).await;
  assert_eq!(status, StatusCode::NOT_FOUND);
  let (status, body) = fx.send("PUT", &format!("/api/notifikasi/user/{}", ids[1]), Some(&token), None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["data"]["is_read"], true);

  let (_, body) = fx.send("GET", "/api/notifikasi/user?is_read=false", Some(&token), None).await;
  assert_eq!(body["pagination"]["total"], 2);

  let (status, _) = fx.send("GET", "/api/notifikasi", Some(&token), None).await;
  assert_eq!(status, StatusCode::FORBIDDEN);
}

// ─── Settings and analytics ──────────────────────────────────────────────────

#[tokio::test]
async fn settings_are_public_to_read_and_superadmin_to_write() {
  let fx = Fixture::new().await;
  let (status, body) = fx.send("GET", "/api/setting-aplikasi", None, None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["data"]["appName"], Value::Null);

  let config = json!({ "appName": "YAMET", "logoUrl": "/logo.png", "colorSchema": "#0A7" });
  let (_, admin) = fx.login_as(Role::Admin).await;
  let (status, _) = fx.send("PUT", "/api/setting-aplikasi", Some(&admin), Some(config.clone())).await;
  assert_eq!(status, StatusCode::FORBIDDEN);

  let (_, root) = fx.login_as(Role::SuperAdmin).await;
  let (status, body) = fx
    .send("PUT", "/api/setting-aplikasi", Some(&root), Some(json!({ "appName": "YAMET", "logoUrl": "" })))
    .await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
  assert_eq!(body["total_errors"], 2);

  let (status, _) = fx.send("PUT", "/api/setting-aplikasi", Some(&root), Some(config)).await;
  assert_eq!(status, StatusCode::OK);
  let (_, body) = fx.send("GET", "/api/setting-aplikasi", None, None).await;
  assert_eq!(body["data"]["colorSchema"], "#0A7");
}

#[tokio::test]
async fn dashboard_is_shaped_by_role() {
  let fx = Fixture::new().await;
  let (_, admin) = fx.login_as(Role::Admin).await;
  let (_, root) = fx.login_as(Role::SuperAdmin).await;
  new_child(&fx, &admin, "Rafa Pratama").await;

  let (status, body) = fx.send("GET", "/api/dashboard/stats?period=all", Some(&root), None).await;
  assert_eq!(status, StatusCode::OK, "{body}");
  assert_eq!(body["data"]["total_anak"], 1);
  assert!(body["data"].get("total_admin").is_some());

  let (status, body) = fx.send("GET", "/api/dashboard/stats", Some(&admin), None).await;
  assert_eq!(status, StatusCode::OK);
  assert!(body["data"].get("total_admin").is_none());

  let (status, _) = fx.send("GET", "/api/dashboard/normalized-stats", Some(&admin), None).await;
  assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn mapping_additions_are_visible_immediately() {
  let fx = Fixture::new().await;
  let (_, manager) = fx.login_as(Role::Manager).await;

  let (status, body) = fx
    .send(
      "POST",
      "/api/dashboard/normalized-stats/mapping",
      Some(&manager),
      Some(json!({ "type": "keluhan", "original": "Belum Bisa Ngomong", "normalized": "Speech Delay" })),
    )
    .await;
  assert_eq!(status, StatusCode::OK, "{body}");
  assert_eq!(body["message"], "Mapping keluhan berhasil ditambahkan");

  let (_, body) = fx.send("GET", "/api/dashboard/normalized-stats/mapping", Some(&manager), None).await;
  assert_eq!(body["data"]["keluhan"]["belum bisa ngomong"], "speech delay");

  let (status, _) = fx
    .send(
      "POST",
      "/api/dashboard/normalized-stats/mapping",
      Some(&manager),
      Some(json!({ "type": "lainnya", "original": "x", "normalized": "y" })),
    )
    .await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn marketing_views_are_for_marketing_only() {
  let fx = Fixture::new().await;
  let (_, admin) = fx.login_as(Role::Admin).await;
  let (_, marketing) = fx.login_as(Role::Marketing).await;
  new_child(&fx, &admin, "Rafa Pratama").await;

  let (status, body) = fx.send("GET", "/api/marketing", Some(&marketing), None).await;
  assert_eq!(status, StatusCode::OK, "{body}");
  assert_eq!(body["message"], "Data marketing berhasil diambil");
  assert_eq!(body["data"]["ringkasan"]["total_pasien"], 1);
  assert_eq!(body["data"]["menu_tersedia"].as_array().unwrap().len(), 3);

  let (status, body) = fx.send("GET", "/api/marketing/konten", Some(&marketing), None).await;
  assert_eq!(status, StatusCode::OK, "{body}");
  assert_eq!(body["data"]["konten_sesuai_usia"].as_array().unwrap().len(), 4);

  let (status, body) = fx.send("GET", "/api/marketing/target-audiens", Some(&marketing), None).await;
  assert_eq!(status, StatusCode::OK, "{body}");
  assert_eq!(body["data"]["profil_pasien"]["distribusi_status"][0]["jumlah"], 1);
  assert_eq!(body["data"]["segmentasi_target"].as_array().unwrap().len(), 4);

  for path in ["/api/marketing", "/api/marketing/konten", "/api/marketing/target-audiens"] {
    let (status, _) = fx.send("GET", path, Some(&admin), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN, "{path}");
  }
}
