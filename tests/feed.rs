mod support;

use time::{Duration, OffsetDateTime};

use pero::application::feed::FeedError;
use pero::application::repos::FollowsRepo;

use support::test_app;

#[tokio::test]
async fn global_feed_orders_by_date_then_id() {
    let app = test_app();
    let leo = app.repos.add_user("leo");
    let moment = OffsetDateTime::now_utc();
    let older = app.repos.add_post_at(leo.id, "older", None, moment - Duration::hours(1));
    let tied_a = app.repos.add_post_at(leo.id, "tied a", None, moment);
    let tied_b = app.repos.add_post_at(leo.id, "tied b", None, moment);

    let page = app.state.feed.global_page(None).await.expect("feed page");
    let ids: Vec<i64> = page.items.iter().map(|post| post.id).collect();

    // Equal timestamps fall back to the newer id.
    assert_eq!(ids, vec![tied_b.id, tied_a.id, older.id]);
}

#[tokio::test]
async fn empty_feed_is_a_single_empty_page() {
    let app = test_app();

    let page = app.state.feed.global_page(None).await.expect("feed page");
    assert!(page.items.is_empty());
    assert_eq!(page.number, 1);
    assert_eq!(page.total_pages, 1);
    assert_eq!(page.total_items, 0);
    assert!(!page.has_previous());
    assert!(!page.has_next());
}

#[tokio::test]
async fn page_numbers_clamp_at_both_ends() {
    let app = support::test_app_with_page_size(5);
    let leo = app.repos.add_user("leo");
    for n in 0..12 {
        app.repos.add_post(leo.id, &format!("entry {n}"), None);
    }

    let last = app.state.feed.global_page(Some(99)).await.expect("page");
    assert_eq!(last.number, 3);
    assert_eq!(last.items.len(), 2);
    assert!(last.has_previous());
    assert!(!last.has_next());

    let first = app.state.feed.global_page(Some(0)).await.expect("page");
    assert_eq!(first.number, 1);
    assert_eq!(first.items.len(), 5);

    let negative = app.state.feed.global_page(Some(-3)).await.expect("page");
    assert_eq!(negative.number, 1);
}

#[tokio::test]
async fn group_feed_contains_only_group_posts() {
    let app = test_app();
    let leo = app.repos.add_user("leo");
    let group = app.repos.add_group("Novels", "novels", "Long-form prose");
    let inside = app.repos.add_post(leo.id, "inside", Some(group.id));
    app.repos.add_post(leo.id, "outside", None);

    let feed = app
        .state
        .feed
        .group_page("novels", None)
        .await
        .expect("group feed");
    assert_eq!(feed.group.id, group.id);
    assert_eq!(feed.page.total_items, 1);
    assert_eq!(feed.page.items[0].id, inside.id);
    assert_eq!(feed.page.items[0].group_title.as_deref(), Some("Novels"));

    let missing = app.state.feed.group_page("ghost", None).await;
    assert!(matches!(missing, Err(FeedError::UnknownGroup)));
}

#[tokio::test]
async fn profile_page_reports_count_and_follow_state() {
    let app = test_app();
    let leo = app.repos.add_user("leo");
    let anna = app.repos.add_user("anna");
    app.repos.add_post(leo.id, "one", None);
    app.repos.add_post(leo.id, "two", None);

    let anonymous = app
        .state
        .feed
        .profile_page("leo", None, None)
        .await
        .expect("profile");
    assert_eq!(anonymous.author.id, leo.id);
    assert_eq!(anonymous.post_count, 2);
    assert!(!anonymous.following);

    app.repos
        .create_if_absent(anna.id, leo.id)
        .await
        .expect("follow created");
    let viewed = app
        .state
        .feed
        .profile_page("leo", None, Some(anna.id))
        .await
        .expect("profile");
    assert!(viewed.following);

    let missing = app.state.feed.profile_page("nobody", None, None).await;
    assert!(matches!(missing, Err(FeedError::UnknownAuthor)));
}

#[tokio::test]
async fn following_feed_tracks_follow_changes() {
    let app = test_app();
    let leo = app.repos.add_user("leo");
    let anna = app.repos.add_user("anna");
    let ivan = app.repos.add_user("ivan");
    app.repos.add_post(leo.id, "leo writes", None);
    app.repos.add_post(anna.id, "anna writes", None);

    let before = app
        .state
        .feed
        .following_page(ivan.id, None)
        .await
        .expect("page");
    assert!(before.items.is_empty());

    app.repos
        .create_if_absent(ivan.id, leo.id)
        .await
        .expect("follow created");
    let after = app
        .state
        .feed
        .following_page(ivan.id, None)
        .await
        .expect("page");
    assert_eq!(after.total_items, 1);
    assert_eq!(after.items[0].author_username, "leo");

    app.repos.delete(ivan.id, leo.id).await.expect("unfollowed");
    let emptied = app
        .state
        .feed
        .following_page(ivan.id, None)
        .await
        .expect("page");
    assert!(emptied.items.is_empty());
}

#[tokio::test]
async fn post_detail_is_addressed_by_author_and_id() {
    let app = test_app();
    let leo = app.repos.add_user("leo");
    let anna = app.repos.add_user("anna");
    let post = app.repos.add_post(leo.id, "discussed", None);
    app.repos.add_post(leo.id, "another", None);

    use pero::application::repos::{CommentsRepo, CreateCommentParams};
    for text in ["first reply", "second reply"] {
        app.repos
            .create_comment(CreateCommentParams {
                text: text.to_string(),
                author_id: anna.id,
                post_id: post.id,
            })
            .await
            .expect("comment created");
    }

    let detail = app
        .state
        .feed
        .post_detail("leo", post.id)
        .await
        .expect("lookup")
        .expect("post found");
    assert_eq!(detail.post.id, post.id);
    assert_eq!(detail.author_post_count, 2);
    let texts: Vec<&str> = detail
        .comments
        .iter()
        .map(|comment| comment.text.as_str())
        .collect();
    assert_eq!(texts, vec!["first reply", "second reply"]);

    // The same id under another author's username does not resolve.
    let mismatched = app
        .state
        .feed
        .post_detail("anna", post.id)
        .await
        .expect("lookup");
    assert!(mismatched.is_none());
}
