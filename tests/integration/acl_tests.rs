/*!
 * Access control over projects, subprojects and translations
 */

use weblate_trans::database::{ProjectRecord, User};
use weblate_trans::managers::Managers;

use crate::common::{create_checkout, create_subproject, import, managers};

/// One public and one ACL protected project, each with an imported translation
fn setup() -> (Managers, tempfile::TempDir) {
    let managers = managers();
    let mut secret = ProjectRecord::new("Secret", "secret");
    secret.enable_acl = true;
    managers.create_project(&secret).unwrap();

    let checkout = create_checkout();
    let public = create_subproject(&managers, "public", "app");
    let hidden = create_subproject(&managers, "secret", "app");
    import(&managers, &public, checkout.path(), "cs");
    import(&managers, &hidden, checkout.path(), "cs");
    (managers, checkout)
}

#[test]
fn test_projectsAllAcl_withAnonymous_shouldHideProtected() {
    let (managers, _checkout) = setup();
    let visible = managers.projects.all_acl(&User::anonymous()).unwrap();

    assert!(!visible.is_unfiltered());
    let slugs: Vec<String> = visible.fetch().unwrap().into_iter().map(|p| p.slug).collect();
    assert_eq!(slugs, vec!["public"]);
}

#[test]
fn test_projectsAllAcl_withPermission_shouldReturnUnfilteredSet() {
    let (managers, _checkout) = setup();
    let user = User::new("joe").with_permission("trans.weblate_acl_secret");

    let visible = managers.projects.all_acl(&user).unwrap();
    assert!(visible.is_unfiltered());
    assert_eq!(visible.count().unwrap(), 2);

    let admin = managers.projects.all_acl(&User::superuser("admin")).unwrap();
    assert!(admin.is_unfiltered());
}

#[test]
fn test_projectsAllAcl_withoutAclProjects_shouldReturnUnfilteredSet() {
    let managers = managers();
    create_subproject(&managers, "open", "app");
    assert!(managers
        .projects
        .all_acl(&User::anonymous())
        .unwrap()
        .is_unfiltered());
}

#[test]
fn test_subprojectsAllAcl_shouldFollowProjectAccess() {
    let (managers, _checkout) = setup();

    let anonymous = managers.subprojects.all_acl(&User::anonymous()).unwrap();
    let names: Vec<String> = anonymous
        .fetch()
        .unwrap()
        .into_iter()
        .map(|s| s.full_slug())
        .collect();
    assert_eq!(names, vec!["public__app"]);

    let joe = User::new("joe").with_permission("trans.weblate_acl_secret");
    assert!(managers.subprojects.all_acl(&joe).unwrap().is_unfiltered());
}

#[test]
fn test_translationsAllAcl_shouldFollowProjectAccess() {
    let (managers, _checkout) = setup();

    let anonymous = managers.translations.all_acl(&User::anonymous()).unwrap();
    let translations = anonymous.fetch().unwrap();
    assert_eq!(translations.len(), 1);
    assert_eq!(translations[0].project_slug, "public");

    // Authenticated but without the permission
    let joe = managers.translations.all_acl(&User::new("joe")).unwrap();
    assert_eq!(joe.count().unwrap(), 1);

    let admin = managers.translations.all_acl(&User::superuser("admin")).unwrap();
    assert_eq!(admin.count().unwrap(), 2);
}
