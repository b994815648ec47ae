//! Field modifiers applied while compiling a status description.

use super::TypeDecl;

/// A wrapper around a field's base type token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldModifier {
    /// Read and write the field under this wire path instead of the one
    /// derived from its name.
    RenamePath(String),
    /// Generate a setter that sends the new value to the field's path.
    Setter,
}

/// A base token together with everything its modifiers requested.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Wrapped {
    base: TypeDecl,
    pub path: Option<String>,
    pub writable: bool,
}

impl Wrapped {
    pub fn new(base: TypeDecl) -> Self {
        Self {
            base,
            path: None,
            writable: false,
        }
    }

    /// The token underneath all modifiers.
    pub fn base(&self) -> &TypeDecl {
        &self.base
    }
}

impl FieldModifier {
    /// Compose this modifier onto an already-wrapped token. Modifiers commute
    /// except that a later rename replaces an earlier one.
    pub fn apply(&self, mut wrapped: Wrapped) -> Wrapped {
        match self {
            FieldModifier::RenamePath(p) => {
                wrapped.path = Some(p.trim_start_matches('/').to_string());
            }
            FieldModifier::Setter => wrapped.writable = true,
        }
        wrapped
    }
}

/// Fold a modifier chain over a base token.
pub fn unwrap_modifiers(base: &TypeDecl, modifiers: &[FieldModifier]) -> Wrapped {
    modifiers
        .iter()
        .fold(Wrapped::new(base.clone()), |w, m| m.apply(w))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_modifiers_compose_and_report_base() {
        let w = unwrap_modifiers(
            &TypeDecl::Int,
            &[
                FieldModifier::Setter,
                FieldModifier::RenamePath("/loop_end".into()),
            ],
        );
        assert_eq!(w.base(), &TypeDecl::Int);
        assert!(w.writable);
        assert_eq!(w.path.as_deref(), Some("loop_end"));
    }

    #[test]
    fn test_later_rename_wins() {
        let w = unwrap_modifiers(
            &TypeDecl::Str,
            &[
                FieldModifier::RenamePath("a".into()),
                FieldModifier::RenamePath("b".into()),
            ],
        );
        assert_eq!(w.path.as_deref(), Some("b"));
        assert!(!w.writable);
    }
}
