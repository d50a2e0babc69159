//! Who may do what. Handlers consult [`allows`] once, before validating
//! input.

use crate::user::Role;

/// A guarded operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
  ViewChildren,
  WriteChildren,
  DeleteChild,
  WriteClinical,
  RecordSession,
  UploadAttachment,
  ViewDashboard,
  ViewNormalizedStats,
  ManageMappings,
  ViewMarketing,
  ListUsers,
  ViewAnyUser,
  ManageNotifications,
  ViewConversions,
  WriteConversions,
  DeleteConversion,
  UpdateSettings,
}

pub fn allows(role: Role, action: Action) -> bool {
  use Role::*;

  match action {
    Action::ViewChildren => matches!(role, SuperAdmin | Admin | Manager | Therapist),
    Action::WriteChildren | Action::DeleteChild | Action::UploadAttachment => {
      matches!(role, SuperAdmin | Admin)
    }
    Action::WriteClinical => matches!(role, SuperAdmin | Admin),
    Action::RecordSession => matches!(role, SuperAdmin | Admin | Therapist),
    Action::ViewDashboard | Action::ViewConversions => matches!(role, SuperAdmin | Admin | Manager),
    Action::ViewNormalizedStats | Action::ManageMappings => matches!(role, SuperAdmin | Manager),
    Action::ViewMarketing => role == Marketing,
    Action::WriteConversions => matches!(role, SuperAdmin | Admin),
    Action::ListUsers
    | Action::ViewAnyUser
    | Action::ManageNotifications
    | Action::DeleteConversion
    | Action::UpdateSettings => role == SuperAdmin,
  }
}

/// Roles an authenticated actor may create accounts for.
pub fn can_register(actor: Role, target: Role) -> bool {
  match actor {
    Role::SuperAdmin => matches!(
      target,
      Role::Admin | Role::Manager | Role::Therapist | Role::Marketing
    ),
    Role::Admin => target == Role::Therapist,
    _ => false,
  }
}

/// Whether `actor` may activate or deactivate an account holding `target`.
pub fn can_toggle(actor: Role, target: Role) -> bool {
  match target {
    Role::Therapist | Role::Parent => matches!(actor, Role::SuperAdmin | Role::Admin),
    _ => actor == Role::SuperAdmin,
  }
}

/// Why an account edit was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditRefusal {
  OtherSuperAdmin,
  OutsideAdminScope,
  NotPermitted,
  /// Only a SUPERADMIN changes roles, and never a SUPERADMIN's own.
  RoleChange,
}

impl EditRefusal {
  pub fn message(self) -> &'static str {
    match self {
      EditRefusal::OtherSuperAdmin => "Superadmin tidak dapat mengubah superadmin lain",
      EditRefusal::OutsideAdminScope => "Admin hanya dapat mengubah terapis dan orang tua",
      EditRefusal::NotPermitted => "Tidak memiliki izin untuk mengubah user",
      EditRefusal::RoleChange => "Tidak memiliki izin untuk mengubah role user ini",
    }
  }
}

/// Whether `actor` may edit the account `target`, optionally moving it to
/// `new_role`.
pub fn can_edit_user(
  actor:    (i64, Role),
  target:   (i64, Role),
  new_role: Option<Role>,
) -> Result<(), EditRefusal> {
  let (actor_id, actor_role)   = actor;
  let (target_id, target_role) = target;
  match actor_role {
    Role::SuperAdmin if target_role == Role::SuperAdmin && target_id != actor_id => {
      return Err(EditRefusal::OtherSuperAdmin);
    }
    Role::SuperAdmin => {}
    Role::Admin if matches!(target_role, Role::Therapist | Role::Parent) => {}
    Role::Admin => return Err(EditRefusal::OutsideAdminScope),
    _ => return Err(EditRefusal::NotPermitted),
  }

  match new_role {
    None => Ok(()),
    Some(role) if role == target_role => Ok(()),
    Some(role) if actor_role == Role::SuperAdmin && target_role != Role::SuperAdmin && role != Role::SuperAdmin => {
      Ok(())
    }
    Some(_) => Err(EditRefusal::RoleChange),
  }
}
