//! `Role` — a node in the organization graph (spec.md §3).

use crate::error::KernelError;

/// A role's growth stage. No transition rule is given numerically in the
/// specification; the rule implemented here (see DESIGN.md) is:
/// `Seed` at creation → `Growth` once active dependency fan-in > 0 →
/// `Structured` immediately after a `differentiate_role` executes on the
/// role (either half) → `Mature` once the role absorbs another role via
/// `compress_roles`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ScaleStage {
    Seed,
    Growth,
    Structured,
    Mature,
}

/// A role in the organization graph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Role {
    pub id: String,
    pub name: String,
    pub purpose: String,
    pub responsibilities: Vec<String>,
    pub required_inputs: Vec<String>,
    pub produced_outputs: Vec<String>,
    pub active: bool,
    pub scale_stage: ScaleStage,
}

/// Validate a role id: lowercase ASCII alphanumeric plus underscore, must
/// start with a letter, non-empty.
pub fn validate_role_id(id: &str) -> Result<(), KernelError> {
    if id.is_empty() {
        return Err(KernelError::BadRoleId {
            role_id: id.to_string(),
            detail: "empty role id".into(),
        });
    }
    let bytes = id.as_bytes();
    if !matches!(bytes[0], b'a'..=b'z') {
        return Err(KernelError::BadRoleId {
            role_id: id.to_string(),
            detail: "role id must start with a lowercase letter".into(),
        });
    }
    for &b in &bytes[1..] {
        if !matches!(b, b'a'..=b'z' | b'0'..=b'9' | b'_') {
            return Err(KernelError::BadRoleId {
                role_id: id.to_string(),
                detail: "role id must be lowercase alphanumeric or underscore".into(),
            });
        }
    }
    Ok(())
}

impl Role {
    /// Construct a freshly created role. Empty `responsibilities` are
    /// substituted with a single `<id>_default` entry before validation, per
    /// spec.md §4.3 `add_role`.
    pub fn new(
        id: String,
        name: String,
        purpose: String,
        mut responsibilities: Vec<String>,
    ) -> Result<Self, KernelError> {
        validate_role_id(&id)?;
        if name.is_empty() {
            return Err(KernelError::BadRoleId {
                role_id: id,
                detail: "name must be non-empty".into(),
            });
        }
        if responsibilities.is_empty() {
            responsibilities.push(format!("{id}_default"));
        }
        Ok(Role {
            id,
            name,
            purpose,
            responsibilities,
            required_inputs: Vec::new(),
            produced_outputs: Vec::new(),
            active: true,
            scale_stage: ScaleStage::Seed,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_responsibilities_get_default() {
        let r = Role::new("eng".into(), "Eng".into(), "build".into(), vec![]).unwrap();
        assert_eq!(r.responsibilities, vec!["eng_default".to_string()]);
    }

    #[test]
    fn uppercase_id_is_rejected() {
        assert!(Role::new("Eng".into(), "Eng".into(), "".into(), vec![]).is_err());
    }

    #[test]
    fn id_with_leading_digit_is_rejected() {
        assert!(Role::new("1eng".into(), "Eng".into(), "".into(), vec![]).is_err());
    }

    #[test]
    fn empty_name_is_rejected() {
        assert!(Role::new("eng".into(), "".into(), "".into(), vec![]).is_err());
    }

    #[test]
    fn new_role_starts_active_in_seed_stage() {
        let r = Role::new("eng".into(), "Eng".into(), "".into(), vec!["a".into()]).unwrap();
        assert!(r.active);
        assert_eq!(r.scale_stage, ScaleStage::Seed);
    }
}
