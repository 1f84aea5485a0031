//! Request classification predicates.

use regex::Regex;
use std::sync::LazyLock;

use rinkorea_core::{Destination, WorkerRequest};

use super::RouteContext;

static STATIC_EXTENSION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\.(?:m?js|css|woff2?|ttf|otf|eot)$").expect("static extension pattern"));

static IMAGE_EXTENSION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\.(?:png|jpe?g|gif|webp|svg|ico|avif)$").expect("image extension pattern"));

const ASSETS_SEGMENT: &str = "/assets/";
const IMAGES_SEGMENT: &str = "/images/";
const API_PREFIX: &str = "/api/";

/// Build output: anything under `/assets/`, scripts, stylesheets and fonts.
pub fn is_static_asset(_ctx: &RouteContext, request: &WorkerRequest) -> bool {
    let path = request.url.path();
    path.contains(ASSETS_SEGMENT) || STATIC_EXTENSION.is_match(path)
}

pub fn is_image(_ctx: &RouteContext, request: &WorkerRequest) -> bool {
    let path = request.url.path();
    path.contains(IMAGES_SEGMENT) || request.destination == Destination::Image || IMAGE_EXTENSION.is_match(path)
}

/// Backend host traffic or same-origin `/api/` routes.
pub fn is_api(ctx: &RouteContext, request: &WorkerRequest) -> bool {
    let backend = request.url.host_str().is_some_and(|host| ctx.is_backend_host(host));
    backend || request.url.path().starts_with(API_PREFIX)
}

pub fn any(_ctx: &RouteContext, _request: &WorkerRequest) -> bool {
    true
}
