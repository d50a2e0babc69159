//! Integration tests for `SqliteStore` against an in-memory database.

use chrono::{DateTime, Duration, TimeZone as _, Utc};
use serde_json::{Value, json};
use yamet_core::{
  child::{ChildFields, ChildQuery, ChildSort, ChildStatus, NewChild},
  clinical::{AssessmentInput, ProgramStatus, SessionInput},
  conversion::{ConversionInput, ConversionPatch, ConversionQuery},
  intake::{OutcomeStatus, Relation},
  notification::{NewNotification, NotificationKind, NotificationPatch, NotificationQuery},
  settings::AppConfig,
  store::{ConversionWrite, Store, UpdateOutcome, UserWrite},
  user::{NewUser, Role, User, UserPatch, UserQuery, UserStatus},
};

use crate::SqliteStore;

async fn store() -> SqliteStore { SqliteStore::open_in_memory().await.expect("in-memory store") }

fn at(y: i32, m: u32, d: u32) -> DateTime<Utc> { Utc.with_ymd_and_hms(y, m, d, 8, 0, 0).unwrap() }

fn new_user(name: &str, email: &str, role: Role) -> NewUser {
  NewUser {
    name:          name.into(),
    email:         Some(email.into()),
    phone:         None,
    role,
    status:        UserStatus::Active,
    password_hash: "$argon2id$stub".into(),
    created_by:    None,
  }
}

async fn user(s: &SqliteStore, email: &str, role: Role) -> User {
  s.create_user(new_user("Staff", email, role)).await.unwrap().expect("fresh email")
}

fn new_child(name: &str, number: &str) -> NewChild {
  NewChild {
    number:     number.into(),
    full_name:  name.into(),
    fields:     ChildFields { status: Some(ChildStatus::Active), ..Default::default() },
    created_by: 1,
  }
}

async fn child(s: &SqliteStore, name: &str) -> i64 {
  s.create_child(new_child(name, &format!("YAMET-2025-{:04}", name.len())), vec![], at(2025, 1, 10))
    .await
    .unwrap()
    .child
    .id
}

// ─── Users and sessions ──────────────────────────────────────────────────────

#[tokio::test]
async fn duplicate_email_is_rejected_case_insensitively() {
  let s = store().await;
  user(&s, "ana@yamet.id", Role::Admin).await;
  let dup = s.create_user(new_user("Other", "ANA@yamet.id", Role::Therapist)).await.unwrap();
  assert!(dup.is_none());
}

#[tokio::test]
async fn login_lookup_by_email_or_phone() {
  let s = store().await;
  let mut input = new_user("Budi", "budi@yamet.id", Role::Therapist);
  input.phone = Some("0812".into());
  s.create_user(input).await.unwrap().unwrap();

  let (u, hash) = s.find_login("BUDI@yamet.id").await.unwrap().unwrap();
  assert_eq!(u.role, Role::Therapist);
  assert_eq!(hash, "$argon2id$stub");
  assert!(s.find_login("0812").await.unwrap().is_some());
  assert!(s.find_login("nobody").await.unwrap().is_none());
}

#[tokio::test]
async fn sessions_expire() {
  let s = store().await;
  let u = user(&s, "a@yamet.id", Role::Admin).await;
  let now = Utc::now();
  s.create_session(u.id, "digest".into(), now + Duration::hours(1)).await.unwrap();

  assert_eq!(s.session_user("digest".into(), now).await.unwrap().unwrap().id, u.id);
  assert!(s.session_user("digest".into(), now + Duration::hours(2)).await.unwrap().is_none());
  assert!(s.delete_session("digest".into()).await.unwrap());
  assert!(s.session_user("digest".into(), now).await.unwrap().is_none());
}

#[tokio::test]
async fn user_updates_keep_contacts_unique() {
  let s = store().await;
  let ana  = user(&s, "ana@yamet.id", Role::Admin).await;
  let budi = user(&s, "budi@yamet.id", Role::Therapist).await;

  let clash = UserPatch { email: Some("ANA@yamet.id".into()), ..Default::default() };
  assert!(matches!(s.update_user(budi.id, clash).await.unwrap(), UserWrite::EmailTaken));

  let own = UserPatch {
    email: Some("ana@yamet.id".into()),
    name:  Some("Ana Lestari".into()),
    role:  Some(Role::Manager),
    ..Default::default()
  };
  let UserWrite::Updated(updated) = s.update_user(ana.id, own).await.unwrap() else {
    panic!("expected update")
  };
  assert_eq!(updated.name, "Ana Lestari");
  assert_eq!(updated.role, Role::Manager);
  assert_eq!(updated.email.as_deref(), Some("ana@yamet.id"));

  assert!(matches!(s.update_user(99, UserPatch::default()).await.unwrap(), UserWrite::NotFound));
}

#[tokio::test]
async fn password_change_replaces_the_login_hash() {
  let s = store().await;
  let ana = user(&s, "ana@yamet.id", Role::Admin).await;
  let patch = UserPatch { password_hash: Some("$argon2id$new".into()), ..Default::default() };
  s.update_user(ana.id, patch).await.unwrap();

  let (_, hash) = s.find_login("ana@yamet.id").await.unwrap().unwrap();
  assert_eq!(hash, "$argon2id$new");
}

#[tokio::test]
async fn issuing_a_session_sweeps_expired_ones() {
  let s = store().await;
  let u = user(&s, "ana@yamet.id", Role::Admin).await;
  let now = Utc::now();
  s.create_session(u.id, "stale".into(), now - Duration::hours(1)).await.unwrap();
  s.create_session(u.id, "fresh".into(), now + Duration::hours(1)).await.unwrap();

  assert!(!s.delete_session("stale".into()).await.unwrap());
  assert!(s.delete_session("fresh".into()).await.unwrap());
}

#[tokio::test]
async fn users_search_count_and_toggle() {
  let s = store().await;
  user(&s, "a@yamet.id", Role::Admin).await;
  let t = user(&s, "t1@yamet.id", Role::Therapist).await;
  user(&s, "t2@yamet.id", Role::Therapist).await;

  let page = s
    .list_users(&UserQuery { search: Some("T1@".into()), ..Default::default() })
    .await
    .unwrap();
  assert_eq!(page.total, 1);

  let counts = s.count_users_by_role().await.unwrap();
  assert!(counts.contains(&(Role::Therapist, 2)));

  assert!(s.set_user_status(t.id, UserStatus::Inactive).await.unwrap());
  assert_eq!(s.get_user(t.id).await.unwrap().unwrap().status, UserStatus::Inactive);
  assert!(!s.set_user_status(999, UserStatus::Active).await.unwrap());
}

// ─── Child creation ──────────────────────────────────────────────────────────

#[tokio::test]
async fn create_reports_every_relation_and_adds_defaults() {
  let s = store().await;
  let sections = vec![
    (Relation::Survey, json!({"keluhan_orang_tua": ["speech delay"]})),
    (Relation::Father, json!({"nama": "Budi", "tahun_meninggal": 0})),
    (Relation::Pregnancy, json!({"diabetes": "ya"})),
    (Relation::PriorTherapies, json!([{"jenis_terapi": "wicara"}, {"jenis_terapi": "okupasi"}])),
  ];
  let created = s
    .create_child(new_child("Andi", "YAMET-2025-0001"), sections, at(2025, 1, 10))
    .await
    .unwrap();

  let summary: Vec<_> = created.relations.iter().map(|r| (r.relation.as_str(), r.status)).collect();
  assert_eq!(summary, vec![
    ("survey_awal", OutcomeStatus::Success),
    ("ayah", OutcomeStatus::Success),
    ("riwayat_kehamilan", OutcomeStatus::Failed),
    ("terapi_sebelumnya", OutcomeStatus::Success),
    ("assessment_default", OutcomeStatus::Success),
    ("program_terapi_default", OutcomeStatus::Success),
  ]);
  assert!(created.relations[2].error.as_deref().unwrap().contains("riwayat_kehamilan.diabetes"));

  let detail = s.get_child(created.child.id).await.unwrap().unwrap();
  assert_eq!(detail.record.sections["ayah"]["tahun_meninggal"], Value::Null);
  assert_eq!(detail.record.sections["riwayat_kehamilan"], Value::Null);
  assert_eq!(detail.record.sections["terapi_sebelumnya"].as_array().unwrap().len(), 2);
  assert_eq!(detail.record.sections["pemeriksaan_sebelumnya"], json!([]));
  assert_eq!(detail.penilaian.len(), 1);
  assert_eq!(detail.penilaian[0].assessment_type, "Assessment Awal");
  assert_eq!(detail.program_terapi[0].program_name, "Program Terapi - Andi");
  assert_eq!(detail.program_terapi[0].status, ProgramStatus::Active);
}

#[tokio::test]
async fn taken_child_number_moves_to_next_free() {
  let s = store().await;
  let first = s
    .create_child(new_child("Andi", "YAMET-2025-0007"), vec![], at(2025, 1, 1))
    .await
    .unwrap();
  let second = s
    .create_child(new_child("Bima", "YAMET-2025-0007"), vec![], at(2025, 1, 1))
    .await
    .unwrap();
  assert_eq!(first.child.number, "YAMET-2025-0007");
  assert_eq!(second.child.number, "YAMET-2025-0008");
}

// ─── Child update ────────────────────────────────────────────────────────────

#[tokio::test]
async fn update_merges_sections_and_keeps_unmentioned_keys() {
  let s = store().await;
  let sections = vec![(Relation::Sleep, json!({"jam_tidur_teratur": true, "jam_tidur_malam": "21:00"}))];
  let id = s
    .create_child(new_child("Andi", "YAMET-2025-0001"), sections, at(2025, 1, 1))
    .await
    .unwrap()
    .child
    .id;

  let outcome = s
    .update_child(
      id,
      ChildFields { nick_name: Some("Dodo".into()), ..Default::default() },
      vec![(Relation::Sleep, json!({"jam_tidur_malam": "20:00"}))],
      2,
      at(2025, 2, 1),
    )
    .await
    .unwrap();
  let UpdateOutcome::Updated(child) = outcome else { panic!("expected update") };
  assert_eq!(child.nick_name.as_deref(), Some("Dodo"));
  assert_eq!(child.full_name, "Andi");
  assert_eq!(child.updated_by, Some(2));

  let detail = s.get_child(id).await.unwrap().unwrap();
  assert_eq!(detail.record.sections["pola_tidur"]["jam_tidur_teratur"], json!(true));
  assert_eq!(detail.record.sections["pola_tidur"]["jam_tidur_malam"], json!("20:00"));
}

#[tokio::test]
async fn invalid_section_rolls_back_the_whole_update() {
  let s = store().await;
  let id = child(&s, "Andi").await;

  let outcome = s
    .update_child(
      id,
      ChildFields { full_name: Some("Andika".into()), ..Default::default() },
      vec![
        (Relation::Survey, json!({"bersedia_online": true})),
        (Relation::Birth, json!({"jenis_kelahiran": "VAKUM"})),
      ],
      2,
      at(2025, 2, 1),
    )
    .await
    .unwrap();
  let UpdateOutcome::Invalid(rejection) = outcome else { panic!("expected rejection") };
  assert_eq!(rejection.relation, Relation::Birth);

  let detail = s.get_child(id).await.unwrap().unwrap();
  assert_eq!(detail.record.child.full_name, "Andi");
  assert_eq!(detail.record.sections["survey_awal"], Value::Null);
}

#[tokio::test]
async fn collections_are_replaced_wholesale() {
  let s = store().await;
  let id = child(&s, "Andi").await;
  let rows = |v: Value| vec![(Relation::PriorExaminations, v)];

  s.update_child(id, ChildFields::default(), rows(json!([{"tempat": "RS A"}, {"tempat": "RS B"}])), 1, at(2025, 2, 1))
    .await
    .unwrap();
  s.update_child(id, ChildFields::default(), rows(json!([{"tempat": "RS C"}])), 1, at(2025, 2, 2))
    .await
    .unwrap();

  let detail = s.get_child(id).await.unwrap().unwrap();
  assert_eq!(detail.record.sections["pemeriksaan_sebelumnya"], json!([{"tempat": "RS C", "usia": null, "diagnosa": null}]));

  s.update_child(id, ChildFields::default(), rows(json!([])), 1, at(2025, 2, 3)).await.unwrap();
  let detail = s.get_child(id).await.unwrap().unwrap();
  assert_eq!(detail.record.sections["pemeriksaan_sebelumnya"], json!([]));
}

#[tokio::test]
async fn leave_is_stamped_then_expires() {
  let s = store().await;
  let id = child(&s, "Andi").await;

  let leave = ChildFields { status: Some(ChildStatus::OnLeave), ..Default::default() };
  let UpdateOutcome::Updated(c) = s.update_child(id, leave, vec![], 1, at(2025, 3, 1)).await.unwrap() else {
    panic!("expected update")
  };
  assert_eq!(c.status, ChildStatus::OnLeave);
  assert_eq!(c.leave_start, Some(at(2025, 3, 1)));

  let UpdateOutcome::Updated(c) = s
    .update_child(id, ChildFields::default(), vec![], 1, at(2025, 6, 2))
    .await
    .unwrap()
  else {
    panic!("expected update")
  };
  assert_eq!(c.status, ChildStatus::Stopped);
}

#[tokio::test]
async fn returning_from_leave_clears_the_leave_start() {
  let s = store().await;
  let id = child(&s, "Andi").await;

  let leave = ChildFields { status: Some(ChildStatus::OnLeave), ..Default::default() };
  s.update_child(id, leave.clone(), vec![], 1, at(2025, 1, 15)).await.unwrap();
  let back = ChildFields { status: Some(ChildStatus::Active), ..Default::default() };
  let UpdateOutcome::Updated(c) = s.update_child(id, back, vec![], 1, at(2025, 2, 1)).await.unwrap() else {
    panic!("expected update")
  };
  assert_eq!(c.leave_start, None);

  // A second leave months later starts fresh instead of stopping at once.
  let UpdateOutcome::Updated(c) = s.update_child(id, leave, vec![], 1, at(2025, 8, 1)).await.unwrap() else {
    panic!("expected update")
  };
  assert_eq!(c.status, ChildStatus::OnLeave);
  assert_eq!(c.leave_start, Some(at(2025, 8, 1)));
}

#[tokio::test]
async fn explicit_null_clears_nullable_columns() {
  let s = store().await;
  let id = child(&s, "Andi").await;
  let named = ChildFields {
    nick_name: Some("Dodo".into()),
    religion:  Some("Islam".into()),
    ..Default::default()
  };
  s.update_child(id, named, vec![], 1, at(2025, 2, 1)).await.unwrap();

  let clear = ChildFields { cleared: vec!["nick_name"], ..Default::default() };
  let UpdateOutcome::Updated(c) = s.update_child(id, clear, vec![], 1, at(2025, 2, 2)).await.unwrap() else {
    panic!("expected update")
  };
  assert_eq!(c.nick_name, None);
  assert_eq!(c.religion.as_deref(), Some("Islam"));
}

#[tokio::test]
async fn update_recreates_missing_defaults() {
  let s = store().await;
  let id = child(&s, "Andi").await;
  let first = s.list_assessments(id, 1, 10).await.unwrap().items[0].id;
  assert!(s.delete_assessment(id, first).await.unwrap());

  s.update_child(id, ChildFields::default(), vec![], 1, at(2025, 2, 1)).await.unwrap();
  let page = s.list_assessments(id, 1, 10).await.unwrap();
  assert_eq!(page.total, 1);
  assert!(page.items[0].notes.as_deref().unwrap().contains("update data anak"));
}

#[tokio::test]
async fn update_of_missing_child_is_not_found() {
  let s = store().await;
  let outcome = s.update_child(42, ChildFields::default(), vec![], 1, Utc::now()).await.unwrap();
  assert_eq!(outcome, UpdateOutcome::NotFound);
}

// ─── Listing and soft delete ─────────────────────────────────────────────────

#[tokio::test]
async fn soft_deleted_children_disappear_from_reads() {
  let s = store().await;
  let a = child(&s, "Andi").await;
  child(&s, "Bima Sakti").await;

  assert!(s.soft_delete_child(a, 1, Utc::now()).await.unwrap());
  assert!(!s.soft_delete_child(a, 1, Utc::now()).await.unwrap());
  assert!(s.get_child(a).await.unwrap().is_none());
  assert!(!s.child_exists(a).await.unwrap());

  let page = s.list_children(&ChildQuery::default()).await.unwrap();
  assert_eq!(page.total, 1);
  assert_eq!(s.dashboard_snapshot().await.unwrap().children.len(), 1);
}

#[tokio::test]
async fn list_children_searches_sorts_and_pages() {
  let s = store().await;
  for name in ["Citra", "andi", "Bima", "Andika Putra"] {
    child(&s, name).await;
  }

  let page = s
    .list_children(&ChildQuery { search: Some("ANDI".into()), ..Default::default() })
    .await
    .unwrap();
  assert_eq!(page.total, 2);

  let page = s
    .list_children(&ChildQuery { sort: ChildSort::FullName, page: 1, limit: 2, ..Default::default() })
    .await
    .unwrap();
  let names: Vec<_> = page.items.iter().map(|r| r.child.full_name.as_str()).collect();
  assert_eq!(names, vec!["andi", "Andika Putra"]);
  assert_eq!(page.total, 4);
  assert!(page.items[0].sections.contains_key("lampiran"));
}

// ─── Clinical records ────────────────────────────────────────────────────────

#[tokio::test]
async fn assessments_are_scoped_to_their_child() {
  let s = store().await;
  let a = child(&s, "Andi").await;
  let b = child(&s, "Bima Sakti").await;

  let input = AssessmentInput {
    assessment_date:   at(2025, 3, 1),
    assessment_type:   "Okupasi".into(),
    assessment_result: None,
    notes:             None,
  };
  let created = s.create_assessment(a, input.clone(), 1).await.unwrap();
  assert!(s.update_assessment(b, created.id, input.clone()).await.unwrap().is_none());
  assert!(!s.delete_assessment(b, created.id).await.unwrap());

  let page = s.list_assessments(a, 1, 10).await.unwrap();
  assert_eq!(page.total, 2);
  assert_eq!(page.items[0].assessment_type, "Okupasi");
}

#[tokio::test]
async fn deleting_a_program_detaches_its_sessions() {
  let s = store().await;
  let id = child(&s, "Andi").await;
  let program = s.list_programs(id, 1, 10).await.unwrap().items[0].clone();

  let session = s
    .record_session(
      id,
      SessionInput { program_id: Some(program.id), therapist_id: None, tanggal_sesi: at(2025, 2, 1), notes: None },
      1,
    )
    .await
    .unwrap()
    .unwrap();
  assert_eq!(session.program_id, Some(program.id));

  let other = child(&s, "Budi").await;
  let stray = SessionInput { program_id: Some(program.id), therapist_id: None, tanggal_sesi: at(2025, 2, 2), notes: None };
  assert!(s.record_session(other, stray, 1).await.unwrap().is_none());

  assert!(s.delete_program(id, program.id).await.unwrap());
  let sessions = s.list_sessions(id, 1, 10).await.unwrap();
  assert_eq!(sessions.items[0].program_id, None);
}

// ─── Attachments ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn attachment_patch_touches_only_given_slots() {
  let s = store().await;
  let id = child(&s, "Andi").await;
  assert!(s.attachments(id).await.unwrap().is_none());

  let patch = |v: Value| match v {
    Value::Object(m) => m,
    _ => unreachable!(),
  };
  s.store_attachments(id, patch(json!({"hasil_eeg_url": "/uploads/lampiran/eeg.pdf"}))).await.unwrap();
  let merged = s
    .store_attachments(id, patch(json!({"perjanjian": "/uploads/lampiran/p.pdf"})))
    .await
    .unwrap();
  assert_eq!(merged["hasil_eeg_url"], json!("/uploads/lampiran/eeg.pdf"));
  assert_eq!(merged["perjanjian"], json!("/uploads/lampiran/p.pdf"));
  assert_eq!(merged["hasil_bera_url"], Value::Null);
}

// ─── Notifications ───────────────────────────────────────────────────────────

#[tokio::test]
async fn notifications_are_filtered_by_destination() {
  let s = store().await;
  let therapist = user(&s, "tia@yamet.id", Role::Therapist).await;
  let admin = user(&s, "ana@yamet.id", Role::Admin).await;

  let direct = format!("USER:{}", admin.id);
  for dest in ["ALL", "ROLE:TERAPIS", direct.as_str(), "tia@yamet.id"] {
    s.create_notification(NewNotification {
      kind:        NotificationKind::Info,
      body:        format!("untuk {dest}"),
      destination: dest.into(),
      created_by:  admin.id,
    })
    .await
    .unwrap();
  }

  assert_eq!(s.notifications_for(&therapist, None, 1, 10).await.unwrap().total, 3);
  assert_eq!(s.notifications_for(&admin, None, 1, 10).await.unwrap().total, 2);

  let all = s.list_notifications(&NotificationQuery::default()).await.unwrap();
  assert_eq!(all.total, 4);
  let admin_only = all.items.iter().find(|n| n.destination.starts_with("USER:")).unwrap();
  assert!(s.mark_read(&therapist, admin_only.id).await.unwrap().is_none());
  assert!(s.mark_read(&admin, admin_only.id).await.unwrap().unwrap().is_read);
  assert_eq!(s.notifications_for(&admin, Some(false), 1, 10).await.unwrap().total, 1);
}

#[tokio::test]
async fn notification_patch_and_delete() {
  let s = store().await;
  let n = s
    .create_notification(NewNotification {
      kind:        NotificationKind::Info,
      body:        "Libur".into(),
      destination: "ALL".into(),
      created_by:  1,
    })
    .await
    .unwrap();

  let patched = s
    .update_notification(n.id, NotificationPatch { kind: Some(NotificationKind::Warning), ..Default::default() })
    .await
    .unwrap()
    .unwrap();
  assert_eq!(patched.kind, NotificationKind::Warning);
  assert_eq!(patched.body, "Libur");

  let found = s
    .list_notifications(&NotificationQuery { search: Some("warn".into()), ..Default::default() })
    .await
    .unwrap();
  assert_eq!(found.total, 1);

  assert!(s.delete_notification(n.id).await.unwrap());
  assert!(s.update_notification(n.id, NotificationPatch::default()).await.unwrap().is_none());
}

// ─── Conversions ─────────────────────────────────────────────────────────────

fn month(bulan: &str, tahun: i32) -> ConversionInput {
  ConversionInput {
    bulan: bulan.into(),
    tahun,
    jumlah_leads: 10,
    jumlah_conversi: 4,
    jumlah_anak_keluar: 1,
  }
}

#[tokio::test]
async fn conversions_are_unique_per_month() {
  let s = store().await;
  let ConversionWrite::Saved(jan) = s.create_conversion(month("Januari", 2025), 1).await.unwrap() else {
    panic!("expected save")
  };
  assert_eq!(s.create_conversion(month("Januari", 2025), 1).await.unwrap(), ConversionWrite::Duplicate);
  s.create_conversion(month("Februari", 2025), 1).await.unwrap();

  let clash = ConversionPatch { bulan: Some("Februari".into()), ..Default::default() };
  assert_eq!(s.update_conversion(jan.id, clash, 2).await.unwrap(), ConversionWrite::Duplicate);

  let bump = ConversionPatch { jumlah_leads: Some(20), ..Default::default() };
  let ConversionWrite::Saved(updated) = s.update_conversion(jan.id, bump, 2).await.unwrap() else {
    panic!("expected save")
  };
  assert_eq!(updated.jumlah_leads, 20);
  assert_eq!(updated.updated_by, Some(2));
  assert_eq!(s.update_conversion(99, ConversionPatch::default(), 2).await.unwrap(), ConversionWrite::NotFound);

  let page = s
    .list_conversions(&ConversionQuery { tahun: Some(2025), search: Some("jan".into()), ..Default::default() })
    .await
    .unwrap();
  assert_eq!(page.total, 1);
  assert!(s.delete_conversion(jan.id).await.unwrap());
}

// ─── Settings ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn app_config_is_a_single_row() {
  let s = store().await;
  assert!(s.app_config().await.unwrap().is_none());

  let cfg = |name: &str| AppConfig {
    app_name:     Some(name.into()),
    logo_url:     Some("/logo.png".into()),
    color_schema: Some("blue".into()),
  };
  s.put_app_config(cfg("YAMET")).await.unwrap();
  s.put_app_config(cfg("YAMET Yogyakarta")).await.unwrap();
  assert_eq!(s.app_config().await.unwrap(), Some(cfg("YAMET Yogyakarta")));
}

// ─── Snapshot ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn snapshot_reads_typed_sections() {
  let s = store().await;
  let sections = vec![
    (Relation::Survey, json!({"keluhan_orang_tua": ["Speech Delay"], "bersedia_online": true})),
    (Relation::Mother, json!({"pendidikan_terakhir": "S1"})),
    (Relation::Family, json!({"tinggal_dengan": ["Keluarga inti"]})),
    (Relation::PriorTherapies, json!([{"jenis_terapi": "wicara"}])),
  ];
  s.create_child(new_child("Andi", "YAMET-2025-0001"), sections, at(2025, 1, 1)).await.unwrap();
  s.create_conversion(month("Januari", 2025), 1).await.unwrap();

  let snap = s.dashboard_snapshot().await.unwrap();
  let facts = &snap.children[0];
  assert_eq!(facts.survey.as_ref().unwrap().complaints(), ["Speech Delay".to_owned()]);
  assert_eq!(facts.mother.as_ref().unwrap().pendidikan_terakhir.as_deref(), Some("S1"));
  assert!(facts.father.is_none());
  assert!(facts.family.as_ref().unwrap().is_nuclear());
  assert_eq!(facts.prior_therapy_count, 1);
  assert_eq!(snap.assessments.len(), 1);
  assert_eq!(snap.programs.len(), 1);
  assert_eq!(snap.conversions.len(), 1);
}
