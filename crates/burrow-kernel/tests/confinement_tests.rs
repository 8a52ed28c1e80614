//! Property tests for path confinement.
//!
//! Paths are generated from segment soups heavy in `..`, `.`, empty
//! segments and names of neighbouring tenants, which is where escapes hide.

use std::path::Path;

use burrow_kernel::vfs::{resolve, FileName};
use burrow_kernel::{FsError, TenantRoot};
use proptest::prelude::*;

fn alice() -> TenantRoot {
    TenantRoot::new("/srv/tenants/alice").unwrap()
}

fn neighbours() -> Vec<TenantRoot> {
    ["/srv/tenants/bob", "/srv/tenants/alice-evil", "/srv/tenants/alicex"]
        .into_iter()
        .map(|p| TenantRoot::new(p).unwrap())
        .collect()
}

fn segment() -> impl Strategy<Value = String> {
    prop_oneof![
        4 => Just("..".to_string()),
        2 => Just(".".to_string()),
        2 => Just(String::new()),
        1 => Just("alice".to_string()),
        1 => Just("alice-evil".to_string()),
        1 => Just("bob".to_string()),
        1 => Just("tenants".to_string()),
        1 => Just("srv".to_string()),
        3 => "[a-z]{1,6}",
    ]
}

fn relative_path() -> impl Strategy<Value = String> {
    (any::<bool>(), prop::collection::vec(segment(), 0..12)).prop_map(|(leading, segs)| {
        let joined = segs.join("/");
        if leading { format!("/{joined}") } else { joined }
    })
}

// ============================================================================
// Confinement
// ============================================================================

proptest! {
    #[test]
    fn resolved_paths_stay_under_root(path in relative_path()) {
        let root = alice();
        match resolve(&root, &path) {
            Ok(resolved) => {
                prop_assert!(resolved.as_path().starts_with(root.as_path()));
                prop_assert!(!resolved.as_path().components().any(|c| c.as_os_str() == ".."));
            }
            Err(err) => prop_assert!(matches!(err, FsError::InvalidPath(_))),
        }
    }

    #[test]
    fn never_lands_in_another_tenant(path in relative_path()) {
        if let Ok(resolved) = resolve(&alice(), &path) {
            for other in neighbours() {
                prop_assert!(
                    !other.contains(resolved.as_path()),
                    "{path:?} resolved into {}", other.as_path().display()
                );
            }
        }
    }

    #[test]
    fn relative_form_rejoins_to_the_same_path(path in relative_path()) {
        let root = alice();
        if let Ok(resolved) = resolve(&root, &path) {
            let again = resolve(&root, resolved.relative()).unwrap();
            prop_assert_eq!(again.as_path(), resolved.as_path());
            prop_assert!(!resolved.relative().starts_with('/'));
            prop_assert!(!resolved.relative().ends_with('/'));
        }
    }

    #[test]
    fn plain_names_always_resolve(segs in prop::collection::vec("[a-z0-9_]{1,8}", 0..6)) {
        let path = segs.join("/");
        let resolved = resolve(&alice(), &path).unwrap();
        prop_assert_eq!(resolved.relative(), path.as_str());
    }

    #[test]
    fn accepted_file_names_are_single_segments(name in "\\PC{0,12}") {
        if let Ok(parsed) = FileName::parse(&name) {
            let mut components = Path::new(parsed.as_str()).components();
            prop_assert!(matches!(components.next(), Some(std::path::Component::Normal(_))));
            prop_assert!(components.next().is_none());
            prop_assert!(!name.contains('/'));
            prop_assert!(!name.contains('\\'));
        }
    }
}

// ============================================================================
// Fixed cases from the boundary check
// ============================================================================

#[test]
fn empty_path_is_root() {
    let root = alice();
    assert_eq!(resolve(&root, "").unwrap().as_path(), root.as_path());
}

#[test]
fn sibling_with_shared_prefix_is_outside() {
    let root = alice();
    assert!(matches!(
        resolve(&root, "../alice-evil/loot"),
        Err(FsError::InvalidPath(_))
    ));
    assert!(matches!(
        resolve(&root, "../alicex"),
        Err(FsError::InvalidPath(_))
    ));
}

#[test]
fn absolute_looking_paths_are_joined_under_root() {
    let root = alice();
    let resolved = resolve(&root, "/etc/passwd").unwrap();
    assert_eq!(
        resolved.as_path(),
        Path::new("/srv/tenants/alice/etc/passwd")
    );
}
