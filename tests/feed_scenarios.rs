use std::sync::Arc;

use lenta::application::feed::{FeedError, FeedService};
use lenta::application::follows::{FollowError, FollowService};
use lenta::application::pagination::{PAGE_SIZE, PageNumber};
use lenta::application::posts::{CommentOutcome, PostComposer, PostForm, SubmitOutcome};
use lenta::application::repos::{
    CommentsRepo, CreateCommentParams, FeedScope, FollowsRepo, ListWindow, PostsRepo,
    PostsWriteRepo, RepoError, UsersRepo,
};
use lenta::infra::db::PostgresRepositories;
use lenta::infra::media::MediaStorage;
use sqlx::PgPool;
use time::{Duration, OffsetDateTime};
use uuid::Uuid;

fn page(n: u32) -> PageNumber {
    PageNumber::from_query(Some(&n.to_string()))
}

async fn seed_user(pool: &PgPool, username: &str) -> Uuid {
    let id = Uuid::new_v4();
    sqlx::query("INSERT INTO users (id, username) VALUES ($1, $2)")
        .bind(id)
        .bind(username)
        .execute(pool)
        .await
        .expect("insert user");
    id
}

async fn seed_group(pool: &PgPool, title: &str, slug: &str) -> Uuid {
    let id = Uuid::new_v4();
    sqlx::query("INSERT INTO groups (id, title, slug, description) VALUES ($1, $2, $3, $4)")
        .bind(id)
        .bind(title)
        .bind(slug)
        .bind(format!("{title} description"))
        .execute(pool)
        .await
        .expect("insert group");
    id
}

/// Insert a post with an explicit timestamp so ordering assertions are
/// deterministic.
async fn seed_post(
    pool: &PgPool,
    author_id: Uuid,
    group_id: Option<Uuid>,
    text: &str,
    created_at: OffsetDateTime,
) -> Uuid {
    let id = Uuid::new_v4();
    sqlx::query(
        "INSERT INTO posts (id, text, author_id, group_id, created_at) \
         VALUES ($1, $2, $3, $4, $5)",
    )
    .bind(id)
    .bind(text)
    .bind(author_id)
    .bind(group_id)
    .bind(created_at)
    .execute(pool)
    .await
    .expect("insert post");
    id
}

fn services(pool: PgPool) -> (Arc<PostgresRepositories>, FeedService, FollowService) {
    let repos = Arc::new(PostgresRepositories::new(pool));
    let feed = FeedService::new(
        repos.clone(),
        repos.clone(),
        repos.clone(),
        repos.clone(),
        repos.clone(),
    );
    let follows = FollowService::new(repos.clone(), repos.clone());
    (repos, feed, follows)
}

fn composer(repos: Arc<PostgresRepositories>) -> PostComposer {
    let media_dir = tempfile::tempdir().expect("tempdir");
    let media = Arc::new(MediaStorage::new(media_dir.keep()).expect("media storage"));
    PostComposer::new(repos.clone(), repos.clone(), repos.clone(), repos, media)
}

#[sqlx::test(migrations = "./migrations")]
async fn group_feed_contains_only_group_posts(pool: PgPool) {
    let author = seed_user(&pool, "leo").await;
    let group = seed_group(&pool, "Котики", "cats").await;
    let other_group = seed_group(&pool, "Собаки", "dogs").await;

    let base = OffsetDateTime::now_utc();
    let in_group = seed_post(&pool, author, Some(group), "про котиков", base).await;
    seed_post(
        &pool,
        author,
        Some(other_group),
        "про собак",
        base - Duration::seconds(10),
    )
    .await;
    seed_post(&pool, author, None, "без группы", base - Duration::seconds(20)).await;

    let (_, feed, _) = services(pool);

    let context = feed
        .group_posts("cats", PageNumber::FIRST)
        .await
        .expect("group feed");
    assert_eq!(context.group.title, "Котики");
    assert_eq!(context.page.items.len(), 1);
    assert_eq!(context.page.items[0].id, in_group);
    assert_eq!(context.page.items[0].group_slug.as_deref(), Some("cats"));

    let missing = feed.group_posts("birds", PageNumber::FIRST).await;
    assert!(matches!(missing, Err(FeedError::GroupNotFound)));
}

#[sqlx::test(migrations = "./migrations")]
async fn profile_paginates_fourteen_posts_across_two_pages(pool: PgPool) {
    let author = seed_user(&pool, "hanna").await;
    let base = OffsetDateTime::now_utc();
    for n in 0..14 {
        seed_post(
            &pool,
            author,
            None,
            &format!("пост {n}"),
            base - Duration::seconds(n),
        )
        .await;
    }

    let (_, feed, _) = services(pool);

    let first = feed
        .profile("hanna", None, PageNumber::FIRST)
        .await
        .expect("first page");
    assert_eq!(first.post_count, 14);
    assert_eq!(first.page.items.len(), PAGE_SIZE as usize);
    assert_eq!(first.page.total_pages, 2);
    assert_eq!(first.page.items[0].text, "пост 0");

    let second = feed.profile("hanna", None, page(2)).await.expect("second page");
    assert_eq!(second.page.items.len(), 4);
    assert_eq!(second.page.items[3].text, "пост 13");

    // Requests past the end clamp to the last page instead of failing.
    let clamped = feed.profile("hanna", None, page(3)).await.expect("clamped");
    assert_eq!(clamped.page.number, 2);
    assert_eq!(clamped.page.items.len(), 4);
}

#[sqlx::test(migrations = "./migrations")]
async fn malformed_page_parameter_falls_back_to_first_page(pool: PgPool) {
    let author = seed_user(&pool, "nils").await;
    seed_post(&pool, author, None, "единственный", OffsetDateTime::now_utc()).await;

    let (_, feed, _) = services(pool);

    let context = feed
        .index(PageNumber::from_query(Some("abc")))
        .await
        .expect("index");
    assert_eq!(context.page.number, 1);
    assert_eq!(context.page.items.len(), 1);
}

#[sqlx::test(migrations = "./migrations")]
async fn follow_feed_tracks_edges(pool: PgPool) {
    let reader_id = seed_user(&pool, "reader").await;
    let author_id = seed_user(&pool, "writer").await;
    seed_post(&pool, author_id, None, "от writer", OffsetDateTime::now_utc()).await;

    let (repos, feed, follows) = services(pool);
    let reader = UsersRepo::find_by_id(repos.as_ref(), reader_id)
        .await
        .expect("load reader")
        .expect("reader exists");

    // Before following, the feed is empty.
    let before = feed
        .follow_index(reader.id, PageNumber::FIRST)
        .await
        .expect("empty follow feed");
    assert!(before.page.items.is_empty());

    follows.follow(&reader, "writer").await.expect("follow");
    // A second follow is a no-op rather than an error.
    follows.follow(&reader, "writer").await.expect("repeat follow");

    let edges = repos
        .list_edges_for(reader.id)
        .await
        .expect("list follow edges");
    assert_eq!(edges.len(), 1);
    assert_eq!(edges[0].author_id, author_id);

    let after = feed
        .follow_index(reader.id, PageNumber::FIRST)
        .await
        .expect("follow feed");
    assert_eq!(after.page.items.len(), 1);
    assert_eq!(after.page.items[0].author_username, "writer");

    let profile = feed
        .profile("writer", Some(reader.id), PageNumber::FIRST)
        .await
        .expect("profile");
    assert!(profile.following);

    follows.unfollow(&reader, "writer").await.expect("unfollow");
    let gone = feed
        .follow_index(reader.id, PageNumber::FIRST)
        .await
        .expect("follow feed after unfollow");
    assert!(gone.page.items.is_empty());

    // Removing an absent edge is an error, unlike repeat follows.
    let missing = follows.unfollow(&reader, "writer").await;
    assert!(matches!(missing, Err(FollowError::FollowNotFound)));
}

#[sqlx::test(migrations = "./migrations")]
async fn self_follow_is_silently_refused(pool: PgPool) {
    let user_id = seed_user(&pool, "narcissus").await;

    let (repos, feed, follows) = services(pool);
    let user = UsersRepo::find_by_id(repos.as_ref(), user_id)
        .await
        .expect("load user")
        .expect("user exists");

    follows.follow(&user, "narcissus").await.expect("self follow is a no-op");

    let profile = feed
        .profile("narcissus", Some(user.id), PageNumber::FIRST)
        .await
        .expect("profile");
    assert!(!profile.following);
}

#[sqlx::test(migrations = "./migrations")]
async fn comment_on_a_missing_post_is_invalid_input(pool: PgPool) {
    let author = seed_user(&pool, "orphan").await;

    let repos = PostgresRepositories::new(pool);
    let result = repos
        .create_comment(CreateCommentParams {
            post_id: Uuid::new_v4(),
            author_id: author,
            text: "в никуда".to_string(),
        })
        .await;

    // The foreign-key violation surfaces as invalid input, not a 500.
    assert!(matches!(result, Err(RepoError::InvalidInput { .. })));
}

#[sqlx::test(migrations = "./migrations")]
async fn deleting_a_post_cascades_to_comments(pool: PgPool) {
    let author_id = seed_user(&pool, "ada").await;
    let commenter = seed_user(&pool, "bob").await;
    let post = seed_post(&pool, author_id, None, "пост", OffsetDateTime::now_utc()).await;

    let repos = Arc::new(PostgresRepositories::new(pool.clone()));
    repos
        .create_comment(CreateCommentParams {
            post_id: post,
            author_id: commenter,
            text: "комментарий".to_string(),
        })
        .await
        .expect("create comment");

    repos.delete_post(post).await.expect("delete post");

    let remaining: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM comments")
        .fetch_one(&pool)
        .await
        .expect("count comments");
    assert_eq!(remaining, 0);

    let again = repos.delete_post(post).await;
    assert!(matches!(again, Err(RepoError::NotFound)));
}

#[sqlx::test(migrations = "./migrations")]
async fn deleting_a_user_cascades_to_posts_and_follows(pool: PgPool) {
    let author = seed_user(&pool, "gone").await;
    let reader = seed_user(&pool, "stays").await;
    seed_post(&pool, author, None, "исчезающий пост", OffsetDateTime::now_utc()).await;
    sqlx::query("INSERT INTO follows (follower_id, author_id) VALUES ($1, $2)")
        .bind(reader)
        .bind(author)
        .execute(&pool)
        .await
        .expect("insert follow");

    sqlx::query("DELETE FROM users WHERE id = $1")
        .bind(author)
        .execute(&pool)
        .await
        .expect("delete user");

    let repos = PostgresRepositories::new(pool.clone());
    let posts = repos
        .count_posts(&FeedScope::Global)
        .await
        .expect("count posts");
    assert_eq!(posts, 0);

    let follows: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM follows")
        .fetch_one(&pool)
        .await
        .expect("count follows");
    assert_eq!(follows, 0);
}

#[sqlx::test(migrations = "./migrations")]
async fn composer_persists_valid_posts_and_rejects_blank_text(pool: PgPool) {
    let author_id = seed_user(&pool, "poet").await;
    let group_id = seed_group(&pool, "Стихи", "verse").await;

    let (repos, feed, _) = services(pool);
    let author = UsersRepo::find_by_id(repos.as_ref(), author_id)
        .await
        .expect("load author")
        .expect("author exists");
    let composer = composer(repos);

    let saved = composer
        .create_post(
            &author,
            PostForm {
                text: "Тестовый пост 1".to_string(),
                group_id: Some(group_id),
                image: None,
            },
        )
        .await
        .expect("create post");
    let post = match saved {
        SubmitOutcome::Saved(post) => post,
        SubmitOutcome::Invalid(errors) => panic!("unexpected validation failure: {errors:?}"),
    };
    assert_eq!(post.group_id, Some(group_id));

    let blank = composer
        .create_post(
            &author,
            PostForm {
                text: "   ".to_string(),
                group_id: None,
                image: None,
            },
        )
        .await
        .expect("validation outcome");
    assert!(matches!(blank, SubmitOutcome::Invalid(_)));

    let detail = feed.post_detail(post.id).await.expect("detail");
    assert_eq!(detail.post.text, "Тестовый пост 1");
    assert_eq!(detail.author_post_count, 1);
}

#[sqlx::test(migrations = "./migrations")]
async fn empty_comments_are_dropped_without_error(pool: PgPool) {
    let author_id = seed_user(&pool, "silent").await;
    let post = seed_post(&pool, author_id, None, "пост", OffsetDateTime::now_utc()).await;

    let (repos, feed, _) = services(pool.clone());
    let author = UsersRepo::find_by_id(repos.as_ref(), author_id)
        .await
        .expect("load author")
        .expect("author exists");
    let composer = composer(repos.clone());

    let dropped = composer
        .add_comment(&author, post, "   ")
        .await
        .expect("drop outcome");
    assert!(matches!(dropped, CommentOutcome::Rejected));

    let added = composer
        .add_comment(&author, post, "по делу")
        .await
        .expect("add outcome");
    assert!(matches!(added, CommentOutcome::Added));

    let detail = feed.post_detail(post).await.expect("detail");
    assert_eq!(detail.comments.len(), 1);
    assert_eq!(detail.comments[0].author_username, "silent");

    let window = repos
        .list_posts(&FeedScope::Global, ListWindow { offset: 0, limit: 10 })
        .await
        .expect("list");
    assert_eq!(window.len(), 1);
}
