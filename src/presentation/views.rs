use askama::{Error as AskamaError, Template};
use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use thiserror::Error;
use uuid::Uuid;

use crate::application::error::{ErrorReport, HttpError};
use crate::application::pagination::Page;
use crate::domain::entities::{CommentRecord, GroupRecord, PostEntry};
use crate::domain::posts::format_human_datetime;

#[derive(Debug, Error)]
#[error("{public_message}")]
pub struct TemplateRenderError {
    pub(crate) source: &'static str,
    pub(crate) public_message: &'static str,
    #[source]
    pub(crate) error: AskamaError,
}

impl TemplateRenderError {
    pub fn new(source: &'static str, public_message: &'static str, error: AskamaError) -> Self {
        Self {
            source,
            public_message,
            error,
        }
    }
}

impl From<TemplateRenderError> for HttpError {
    fn from(err: TemplateRenderError) -> Self {
        let TemplateRenderError {
            source,
            public_message,
            error,
        } = err;

        HttpError::from_error(
            source,
            StatusCode::INTERNAL_SERVER_ERROR,
            public_message,
            &error,
        )
    }
}

pub fn render_template<T: Template>(template: T) -> Result<Html<String>, HttpError> {
    template.render().map(Html).map_err(|err| {
        TemplateRenderError::new(
            "presentation::views::render_template",
            "Template rendering failed",
            err,
        )
        .into()
    })
}

pub fn render_template_response<T: Template>(template: T, status: StatusCode) -> Response {
    match render_template(template) {
        Ok(html) => (status, html).into_response(),
        Err(err) => err.into_response(),
    }
}

pub fn render_not_found_response(viewer: ViewerContext) -> Response {
    let mut response =
        render_template_response(NotFoundTemplate { viewer }, StatusCode::NOT_FOUND);
    ErrorReport::from_message(
        "presentation::views::render_not_found_response",
        StatusCode::NOT_FOUND,
        "Resource not found",
    )
    .attach(&mut response);
    response
}

/// Authenticated-viewer chrome shared by every page.
#[derive(Clone, Default)]
pub struct ViewerContext {
    pub username: Option<String>,
}

impl ViewerContext {
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn named(username: String) -> Self {
        Self {
            username: Some(username),
        }
    }
}

#[derive(Clone)]
pub struct PostItemView {
    pub id: Uuid,
    pub author_username: String,
    pub group_slug: Option<String>,
    pub group_title: Option<String>,
    pub text: String,
    pub image_url: Option<String>,
    pub created: String,
}

impl From<PostEntry> for PostItemView {
    fn from(entry: PostEntry) -> Self {
        Self {
            id: entry.id,
            author_username: entry.author_username,
            group_slug: entry.group_slug,
            group_title: entry.group_title,
            text: entry.text,
            image_url: entry.image_path.map(|path| format!("/media/{path}")),
            created: format_human_datetime(entry.created_at),
        }
    }
}

#[derive(Clone)]
pub struct CommentView {
    pub author_username: String,
    pub text: String,
    pub created: String,
}

impl From<CommentRecord> for CommentView {
    fn from(record: CommentRecord) -> Self {
        Self {
            author_username: record.author_username,
            text: record.text,
            created: format_human_datetime(record.created_at),
        }
    }
}

#[derive(Clone)]
pub struct GroupView {
    pub title: String,
    pub slug: String,
    pub description: String,
}

impl From<GroupRecord> for GroupView {
    fn from(record: GroupRecord) -> Self {
        Self {
            title: record.title,
            slug: record.slug,
            description: record.description,
        }
    }
}

#[derive(Clone)]
pub struct GroupChoiceView {
    pub id: Uuid,
    pub title: String,
    pub selected: bool,
}

impl GroupChoiceView {
    pub fn choices(groups: Vec<GroupRecord>, selected: Option<Uuid>) -> Vec<Self> {
        groups
            .into_iter()
            .map(|record| Self {
                selected: selected == Some(record.id),
                id: record.id,
                title: record.title,
            })
            .collect()
    }
}

/// Page slice plus the links the paginator bar renders.
#[derive(Clone)]
pub struct FeedPageView {
    pub posts: Vec<PostItemView>,
    pub number: u32,
    pub total_pages: u32,
    pub has_previous: bool,
    pub has_next: bool,
    pub previous: u32,
    pub next: u32,
    pub base_path: String,
}

impl FeedPageView {
    pub fn from_page(page: Page<PostEntry>, base_path: impl Into<String>) -> Self {
        let has_previous = page.has_previous();
        let has_next = page.has_next();
        let previous = page.previous_number();
        let next = page.next_number();
        Self {
            posts: page.items.into_iter().map(PostItemView::from).collect(),
            number: page.number,
            total_pages: page.total_pages,
            has_previous,
            has_next,
            previous,
            next,
            base_path: base_path.into(),
        }
    }
}

#[derive(Template)]
#[template(path = "index.html")]
pub struct IndexTemplate {
    pub viewer: ViewerContext,
    pub feed: FeedPageView,
}

#[derive(Template)]
#[template(path = "group_list.html")]
pub struct GroupTemplate {
    pub viewer: ViewerContext,
    pub group: GroupView,
    pub feed: FeedPageView,
}

#[derive(Template)]
#[template(path = "profile.html")]
pub struct ProfileTemplate {
    pub viewer: ViewerContext,
    pub author_username: String,
    pub post_count: u64,
    pub following: bool,
    pub is_self: bool,
    pub feed: FeedPageView,
}

#[derive(Template)]
#[template(path = "post_detail.html")]
pub struct PostDetailTemplate {
    pub viewer: ViewerContext,
    pub title_preview: String,
    pub post: PostItemView,
    pub author_post_count: u64,
    pub can_edit: bool,
    pub comments: Vec<CommentView>,
}

#[derive(Template)]
#[template(path = "post_form.html")]
pub struct PostFormTemplate {
    pub viewer: ViewerContext,
    pub heading: &'static str,
    pub submit_label: &'static str,
    pub action: String,
    pub text_value: String,
    pub groups: Vec<GroupChoiceView>,
    pub text_error: Option<&'static str>,
}

#[derive(Template)]
#[template(path = "follow.html")]
pub struct FollowTemplate {
    pub viewer: ViewerContext,
    pub feed: FeedPageView,
}

#[derive(Template)]
#[template(path = "not_found.html")]
pub struct NotFoundTemplate {
    pub viewer: ViewerContext,
}
