//! Post and comment submission handlers.

use axum::{
    Extension, Form,
    extract::{Multipart, Path, State},
    http::{StatusCode, Uri},
    response::{IntoResponse, Redirect, Response},
};
use bytes::Bytes;
use serde::Deserialize;
use uuid::Uuid;

use crate::{
    application::{
        error::HttpError,
        posts::{
            ComposeError, EditAccess, FormErrors, PostForm, SubmitOutcome, UpdateOutcome,
            UploadedImage,
        },
    },
    presentation::views::{
        GroupChoiceView, PostFormTemplate, render_not_found_response, render_template_response,
    },
};

use super::{
    auth::{Viewer, login_redirect},
    public::HttpState,
};

pub(super) async fn create_form(
    State(state): State<HttpState>,
    Extension(viewer): Extension<Viewer>,
) -> Response {
    let groups = match state.composer.group_choices().await {
        Ok(groups) => groups,
        Err(err) => return compose_error_to_response(err, &viewer),
    };

    render_template_response(
        PostFormTemplate {
            viewer: viewer.context(),
            heading: "Новый пост",
            submit_label: "Добавить",
            action: "/create".to_string(),
            text_value: String::new(),
            groups: GroupChoiceView::choices(groups, None),
            text_error: None,
        },
        StatusCode::OK,
    )
}

pub(super) async fn create_submit(
    State(state): State<HttpState>,
    Extension(viewer): Extension<Viewer>,
    uri: Uri,
    multipart: Multipart,
) -> Response {
    let Some(author) = viewer.user().cloned() else {
        return login_redirect(&uri);
    };

    let form = match read_post_form(multipart).await {
        Ok(form) => form,
        Err(err) => return err.into_response(),
    };

    match state.composer.create_post(&author, form.clone()).await {
        Ok(SubmitOutcome::Saved(_)) => {
            Redirect::to(&format!("/profile/{}", author.username)).into_response()
        }
        Ok(SubmitOutcome::Invalid(errors)) => {
            rerender_form(
                state,
                viewer,
                "Новый пост",
                "Добавить",
                "/create".to_string(),
                form,
                errors,
            )
            .await
        }
        Err(err) => compose_error_to_response(err, &viewer),
    }
}

pub(super) async fn edit_form(
    State(state): State<HttpState>,
    Extension(viewer): Extension<Viewer>,
    Path(post_id): Path<String>,
    uri: Uri,
) -> Response {
    let Some(editor) = viewer.user().cloned() else {
        return login_redirect(&uri);
    };
    let Ok(post_id) = post_id.parse::<Uuid>() else {
        return render_not_found_response(viewer.context());
    };

    let post = match state.composer.edit_access(&editor, post_id).await {
        Ok(EditAccess::Granted(post)) => post,
        Ok(EditAccess::NotAuthor) => return redirect_to_detail(post_id),
        Err(err) => return compose_error_to_response(err, &viewer),
    };

    let groups = match state.composer.group_choices().await {
        Ok(groups) => groups,
        Err(err) => return compose_error_to_response(err, &viewer),
    };

    render_template_response(
        PostFormTemplate {
            viewer: viewer.context(),
            heading: "Редактировать запись",
            submit_label: "Сохранить",
            action: format!("/posts/{post_id}/edit"),
            text_value: post.text,
            groups: GroupChoiceView::choices(groups, post.group_id),
            text_error: None,
        },
        StatusCode::OK,
    )
}

pub(super) async fn edit_submit(
    State(state): State<HttpState>,
    Extension(viewer): Extension<Viewer>,
    Path(post_id): Path<String>,
    uri: Uri,
    multipart: Multipart,
) -> Response {
    let Some(editor) = viewer.user().cloned() else {
        return login_redirect(&uri);
    };
    let Ok(post_id) = post_id.parse::<Uuid>() else {
        return render_not_found_response(viewer.context());
    };

    let form = match read_post_form(multipart).await {
        Ok(form) => form,
        Err(err) => return err.into_response(),
    };

    match state.composer.update_post(&editor, post_id, form.clone()).await {
        Ok(UpdateOutcome::Saved(post)) => redirect_to_detail(post.id),
        Ok(UpdateOutcome::NotAuthor) => redirect_to_detail(post_id),
        Ok(UpdateOutcome::Invalid(errors)) => {
            rerender_form(
                state,
                viewer,
                "Редактировать запись",
                "Сохранить",
                format!("/posts/{post_id}/edit"),
                form,
                errors,
            )
            .await
        }
        Err(err) => compose_error_to_response(err, &viewer),
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(super) struct CommentForm {
    text: String,
}

/// Comments redirect back to the detail view whether the text was
/// accepted or dropped; only a missing post surfaces as 404.
pub(super) async fn add_comment(
    State(state): State<HttpState>,
    Extension(viewer): Extension<Viewer>,
    Path(post_id): Path<String>,
    uri: Uri,
    Form(form): Form<CommentForm>,
) -> Response {
    let Some(author) = viewer.user().cloned() else {
        return login_redirect(&uri);
    };
    let Ok(post_id) = post_id.parse::<Uuid>() else {
        return render_not_found_response(viewer.context());
    };

    match state.composer.add_comment(&author, post_id, &form.text).await {
        Ok(_) => redirect_to_detail(post_id),
        Err(ComposeError::PostNotFound) => render_not_found_response(viewer.context()),
        Err(err) => compose_error_to_response(err, &viewer),
    }
}

async fn rerender_form(
    state: HttpState,
    viewer: Viewer,
    heading: &'static str,
    submit_label: &'static str,
    action: String,
    form: PostForm,
    errors: FormErrors,
) -> Response {
    let groups = match state.composer.group_choices().await {
        Ok(groups) => groups,
        Err(err) => return compose_error_to_response(err, &viewer),
    };

    render_template_response(
        PostFormTemplate {
            viewer: viewer.context(),
            heading,
            submit_label,
            action,
            text_value: form.text,
            groups: GroupChoiceView::choices(groups, form.group_id),
            text_error: errors.text,
        },
        StatusCode::OK,
    )
}

fn redirect_to_detail(post_id: Uuid) -> Response {
    Redirect::to(&format!("/posts/{post_id}")).into_response()
}

fn compose_error_to_response(err: ComposeError, viewer: &Viewer) -> Response {
    match err {
        ComposeError::PostNotFound | ComposeError::GroupNotFound => {
            render_not_found_response(viewer.context())
        }
        ComposeError::Media(err) => HttpError::from_error(
            "infra::http::posts",
            StatusCode::INTERNAL_SERVER_ERROR,
            "Failed to store uploaded image",
            &err,
        )
        .into_response(),
        ComposeError::Repo(err) => super::repo_error_to_http("infra::http::posts", err).into_response(),
    }
}

/// Decode the multipart post form: `text`, optional `group` id, and an
/// optional `image` file part.
async fn read_post_form(mut multipart: Multipart) -> Result<PostForm, HttpError> {
    const SOURCE: &str = "infra::http::posts::read_post_form";

    let mut form = PostForm::default();

    while let Some(field) = multipart.next_field().await.map_err(|err| {
        HttpError::from_error(SOURCE, StatusCode::BAD_REQUEST, "Malformed form data", &err)
    })? {
        match field.name() {
            Some("text") => {
                form.text = field.text().await.map_err(|err| {
                    HttpError::from_error(
                        SOURCE,
                        StatusCode::BAD_REQUEST,
                        "Malformed text field",
                        &err,
                    )
                })?;
            }
            Some("group") => {
                let raw = field.text().await.map_err(|err| {
                    HttpError::from_error(
                        SOURCE,
                        StatusCode::BAD_REQUEST,
                        "Malformed group field",
                        &err,
                    )
                })?;
                form.group_id = raw.trim().parse::<Uuid>().ok();
            }
            Some("image") => {
                let filename = field.file_name().unwrap_or("upload").to_string();
                let bytes: Bytes = field.bytes().await.map_err(|err| {
                    HttpError::from_error(
                        SOURCE,
                        StatusCode::PAYLOAD_TOO_LARGE,
                        "Uploaded image too large",
                        &err,
                    )
                })?;
                if !bytes.is_empty() {
                    form.image = Some(UploadedImage { filename, bytes });
                }
            }
            _ => {}
        }
    }

    Ok(form)
}
