//! Application Model Tests
//!
//! Drives the application model over the in-process backend, the way a UI
//! would.

mod common;

use fileshare::app::{
    parse_share_link, FilterUpdate, Navigation, NoticeLevel, Resolution, Route, Screen,
    SortDirection, SortField, UploadFile,
};

use common::{local_app, LocalApp, PASSWORD};

async fn signed_in(email: &str) -> LocalApp {
    let local = local_app().await;
    let nav = local.app.session().sign_in(email, PASSWORD).await;
    assert_eq!(nav, Some(Navigation::Push(Route::Dashboard)));
    local.app.files().fetch_files().await;
    local.notices.drain();
    local
}

fn names(local: &LocalApp) -> Vec<String> {
    local
        .app
        .files()
        .files()
        .into_iter()
        .map(|f| f.name)
        .collect()
}

fn id_of(local: &LocalApp, name: &str) -> String {
    local
        .app
        .files()
        .files()
        .into_iter()
        .find(|f| f.name == name)
        .map(|f| f.id)
        .unwrap()
}

#[tokio::test]
async fn test_sign_in_and_out() {
    let local = local_app().await;
    assert!(local.app.session().identity().is_none());
    assert!(!local.app.session().is_loading());
    assert_eq!(
        local.app.resolve("/dashboard"),
        Resolution::Redirect(Route::Login)
    );

    let nav = local
        .app
        .session()
        .sign_in("alice@example.com", PASSWORD)
        .await;
    assert_eq!(nav, Some(Navigation::Push(Route::Dashboard)));
    assert_eq!(
        local.app.session().identity().unwrap().email,
        "alice@example.com"
    );
    assert_eq!(
        local.notices.last().unwrap().message,
        "Signed in successfully"
    );
    assert_eq!(
        local.app.resolve("/login"),
        Resolution::Redirect(Route::Dashboard)
    );

    let nav = local.app.session().sign_out().await;
    assert_eq!(nav, Some(Navigation::Reload(Route::Login)));
    assert!(local.app.session().identity().is_none());
    assert_eq!(
        local.notices.last().unwrap().message,
        "Signed out successfully"
    );
}

#[tokio::test]
async fn test_sign_in_wrong_password() {
    let local = local_app().await;

    let nav = local
        .app
        .session()
        .sign_in("alice@example.com", "not-the-password")
        .await;
    assert_eq!(nav, None);
    assert!(local.app.session().identity().is_none());

    let notice = local.notices.last().unwrap();
    assert_eq!(notice.level, NoticeLevel::Error);
    assert_eq!(notice.message, "Invalid login credentials");
}

#[tokio::test]
async fn test_sign_up_signs_in() {
    let local = local_app().await;

    let nav = local
        .app
        .session()
        .sign_up("carol@example.com", PASSWORD, "Carol")
        .await;
    assert_eq!(nav, Some(Navigation::Push(Route::Dashboard)));
    let identity = local.app.session().identity().unwrap();
    assert_eq!(identity.email, "carol@example.com");
    assert_eq!(identity.display_name.as_deref(), Some("Carol"));

    let messages: Vec<String> = local.notices.drain().into_iter().map(|n| n.message).collect();
    assert!(messages.contains(&"Account created successfully! Signing you in...".to_string()));
    assert!(messages.contains(&"Signed in successfully".to_string()));
}

#[tokio::test]
async fn test_sign_up_duplicate_email() {
    let local = local_app().await;

    let nav = local
        .app
        .session()
        .sign_up("alice@example.com", PASSWORD, "Alice")
        .await;
    assert_eq!(nav, None);
    assert!(local.app.session().identity().is_none());
    assert_eq!(
        local.notices.last().unwrap().message,
        "User already registered"
    );
}

#[tokio::test]
async fn test_upload_and_sort() {
    let local = signed_in("alice@example.com").await;
    let files = local.app.files();

    assert!(files.upload_file(UploadFile::new("b.txt", b"bb".to_vec())).await);
    assert!(files.upload_file(UploadFile::new("a.txt", b"a".to_vec())).await);
    assert!(files.upload_file(UploadFile::new("c.txt", b"ccc".to_vec())).await);
    assert_eq!(
        local.notices.last().unwrap().message,
        "File uploaded successfully"
    );

    files.set_filter(FilterUpdate::sort(SortField::Name, SortDirection::Asc));
    assert_eq!(names(&local), vec!["a.txt", "b.txt", "c.txt"]);

    files.set_filter(FilterUpdate::sort(SortField::Size, SortDirection::Desc));
    assert_eq!(names(&local), vec!["c.txt", "b.txt", "a.txt"]);

    files.set_filter(FilterUpdate::search("B."));
    assert_eq!(names(&local), vec!["b.txt"]);

    let file = files.files().remove(0);
    assert_eq!(file.size, 2);
    assert_eq!(file.content_type, "text/plain");
    assert_eq!(file.path, format!("{}/b.txt", file.owner_id));
    assert!(file.url.contains("/storage/v1/object/sign/files/"));

    let link = files.download_file(&file);
    assert_eq!(link.file_name, "b.txt");
    assert_eq!(link.url, file.url);
}

#[tokio::test]
async fn test_upload_replaces_same_name() {
    let local = signed_in("alice@example.com").await;
    let files = local.app.files();

    assert!(files.upload_file(UploadFile::new("a.txt", b"one".to_vec())).await);
    assert!(files.upload_file(UploadFile::new("a.txt", b"three".to_vec())).await);

    let listed = files.files();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].size, 5);
}

#[tokio::test]
async fn test_upload_over_limit_rejected() {
    let local = signed_in("alice@example.com").await;
    let files = local.app.files();

    let too_big = UploadFile::new("big.bin", vec![0u8; 3 * 1024 * 1024 + 1]);
    assert!(!files.upload_file(too_big).await);
    assert_eq!(
        local.notices.last().unwrap().message,
        "File size exceeds the 3MB limit"
    );
    assert!(files.files().is_empty());

    let at_limit = UploadFile::new("exact.bin", vec![0u8; 3 * 1024 * 1024]);
    assert!(files.upload_file(at_limit).await);
    assert_eq!(names(&local), vec!["exact.bin"]);
}

#[tokio::test]
async fn test_upload_requires_sign_in() {
    let local = local_app().await;

    assert!(
        !local
            .app
            .files()
            .upload_file(UploadFile::new("a.txt", b"a".to_vec()))
            .await
    );
    assert!(local.notices.notices().is_empty());
}

#[tokio::test]
async fn test_select_and_delete() {
    let local = signed_in("alice@example.com").await;
    let files = local.app.files();
    for name in ["a.txt", "b.txt", "c.txt"] {
        assert!(files.upload_file(UploadFile::new(name, b"x".to_vec())).await);
    }

    files.select_all_files();
    assert_eq!(files.selected_files().len(), 3);
    files.select_all_files();
    assert!(files.selected_files().is_empty());

    let a = id_of(&local, "a.txt");
    let b = id_of(&local, "b.txt");
    files.toggle_select_file(&a);
    files.toggle_select_file(&b);
    assert_eq!(files.selected_files().len(), 2);

    files.delete_files(&files.selected_files()).await;
    assert_eq!(
        local.notices.last().unwrap().message,
        "2 file(s) deleted successfully"
    );
    assert!(files.selected_files().is_empty());
    assert_eq!(names(&local), vec!["c.txt"]);
}

#[tokio::test]
async fn test_listing_follows_user() {
    let local = signed_in("alice@example.com").await;
    let files = local.app.files();
    assert!(files.upload_file(UploadFile::new("alice.txt", b"a".to_vec())).await);

    local.app.session().sign_out().await;
    files.fetch_files().await;
    assert!(files.files().is_empty());

    local.app.session().sign_in("bob@example.com", PASSWORD).await;
    files.fetch_files().await;
    assert!(files.files().is_empty());
    assert_eq!(
        files.listed_owner(),
        local.app.session().identity().map(|i| i.id)
    );
}

#[tokio::test]
async fn test_share_and_resolve() {
    let local = signed_in("alice@example.com").await;
    let files = local.app.files();
    assert!(
        files
            .upload_file(UploadFile::new("a.pdf", b"%PDF".to_vec()).with_content_type("application/pdf"))
            .await
    );
    let alice = local.app.session().identity().unwrap().id;
    let id = id_of(&local, "a.pdf");

    let link = files.share_file(&id).await;
    assert_eq!(
        link,
        format!("https://files.example.com/share/{}%2Fa.pdf", alice)
    );

    let share_id = parse_share_link(&link).unwrap();
    assert_eq!(
        local.app.resolve(&format!("/share/{}", share_id)),
        Resolution::Render(Screen::Share(share_id.clone()))
    );

    let shared = local
        .app
        .shares()
        .get_file_by_share_id(&share_id)
        .await
        .unwrap();
    assert_eq!(shared.name, "a.pdf");
    assert_eq!(shared.id, id);
    assert_eq!(shared.owner_id, alice);
    assert_eq!(shared.path, format!("{}/a.pdf", alice));
    assert!(shared.url.contains("token="));
}

#[tokio::test]
async fn test_share_unknown_file() {
    let local = signed_in("alice@example.com").await;

    assert_eq!(local.app.files().share_file("missing").await, "");
    assert_eq!(local.notices.last().unwrap().message, "File not found");
}

#[tokio::test]
async fn test_unshared_path_not_resolved() {
    let local = signed_in("alice@example.com").await;
    let files = local.app.files();
    assert!(files.upload_file(UploadFile::new("private.txt", b"p".to_vec())).await);
    let alice = local.app.session().identity().unwrap().id;

    let share_id = format!("{}%2Fprivate.txt", alice);
    assert!(local
        .app
        .shares()
        .get_file_by_share_id(&share_id)
        .await
        .is_none());

    let view = local.app.open_share(&share_id).await;
    assert!(view.file.is_none());
    assert!(!view.can_save);
}

#[tokio::test]
async fn test_share_page_is_public() {
    let local = signed_in("alice@example.com").await;
    let files = local.app.files();
    assert!(files.upload_file(UploadFile::new("a.pdf", b"%PDF".to_vec())).await);
    let link = files.share_file(&id_of(&local, "a.pdf")).await;
    let share_id = parse_share_link(&link).unwrap();

    local.app.session().sign_out().await;
    assert_eq!(
        local.app.resolve(&format!("/share/{}", share_id)),
        Resolution::Render(Screen::Share(share_id.clone()))
    );

    let view = local.app.open_share(&share_id).await;
    assert_eq!(view.file.unwrap().name, "a.pdf");
    assert!(!view.can_save);
}

#[tokio::test]
async fn test_add_shared_file_to_my_files() {
    let local = signed_in("alice@example.com").await;
    let files = local.app.files();
    assert!(
        files
            .upload_file(UploadFile::new("a.pdf", b"%PDF".to_vec()).with_content_type("application/pdf"))
            .await
    );
    let file_id = id_of(&local, "a.pdf");
    let link = files.share_file(&file_id).await;
    let share_id = parse_share_link(&link).unwrap();

    local.app.session().sign_out().await;
    local.app.session().sign_in("bob@example.com", PASSWORD).await;
    files.fetch_files().await;
    local.notices.drain();

    let view = local.app.open_share(&share_id).await;
    assert!(view.can_save);
    let shared = view.file.unwrap();

    assert!(
        local
            .app
            .shares()
            .add_shared_file_to_my_files(&shared.id)
            .await
    );
    assert_eq!(
        local.notices.last().unwrap().message,
        "File added to your files successfully"
    );

    let bob = local.app.session().identity().unwrap().id;
    let mine = files.files();
    assert_eq!(mine.len(), 1);
    assert_eq!(mine[0].name, "a.pdf");
    assert_eq!(mine[0].path, format!("{}/a.pdf", bob));
    assert_eq!(mine[0].content_type, "application/pdf");
    assert_eq!(mine[0].size, 4);
}

#[tokio::test]
async fn test_add_unknown_shared_file() {
    let local = signed_in("bob@example.com").await;

    assert!(
        !local
            .app
            .shares()
            .add_shared_file_to_my_files("no-such-file")
            .await
    );
    assert_eq!(
        local.notices.last().unwrap().message,
        "Failed to add file to your collection"
    );
}

#[tokio::test]
async fn test_route_guards() {
    let local = local_app().await;

    assert_eq!(local.app.resolve("/"), Resolution::Render(Screen::Landing));
    assert_eq!(local.app.resolve("/register"), Resolution::Render(Screen::Register));
    assert_eq!(
        local.app.resolve("/no/such/page"),
        Resolution::Render(Screen::NotFound)
    );
    assert_eq!(
        local.app.resolve("/dashboard?tab=files"),
        Resolution::Redirect(Route::Login)
    );

    local
        .app
        .session()
        .sign_in("alice@example.com", PASSWORD)
        .await;
    assert_eq!(
        local.app.resolve("/dashboard/"),
        Resolution::Render(Screen::Dashboard)
    );
    assert_eq!(
        local.app.resolve("/register"),
        Resolution::Redirect(Route::Dashboard)
    );
}
