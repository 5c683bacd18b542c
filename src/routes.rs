use std::collections::HashMap;

use serde::Serialize;
use stmt_table::{OutputFormat, PageSelection};
use worker::{Context, Env, Request, Response, Result, RouteContext, Router};

use crate::convert::{
    ConvertConfig, convert_pdf_bytes, convert_response, render_attachment, validate_body,
};
use crate::error::ApiError;
use crate::models::{DEFAULT_FILENAME_STEM, HealthResponse};

pub async fn handle(req: Request, env: Env, _ctx: Context) -> Result<Response> {
    let config = match ConvertConfig::from_env(&env) {
        Ok(config) => config,
        Err(error) => {
            worker::console_error!("invalid worker configuration: {error}");
            return error.into_response();
        }
    };

    Router::with_data(config)
        .get("/api/v1/health", health_route)
        .post_async("/api/v1/convert", convert_route)
        .run(req, env)
        .await
}

fn health_route(_req: Request, _ctx: RouteContext<ConvertConfig>) -> Result<Response> {
    json_response(&HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

async fn convert_route(mut req: Request, ctx: RouteContext<ConvertConfig>) -> Result<Response> {
    match convert(&mut req, &ctx.data).await {
        Ok(response) => Ok(response),
        Err(error) => {
            worker::console_error!("statement conversion failed: {error}");
            error.into_response()
        }
    }
}

async fn convert(req: &mut Request, config: &ConvertConfig) -> Result<Response, ApiError> {
    let query = parse_query(req)?;
    let format = parse_format_query(&query)?;
    let pages = parse_pages_query(&query)?;
    let filename = attachment_filename(query.get("filename").map(String::as_str), format);

    let body = req.bytes().await?;
    validate_body(&body, config.max_upload_bytes)?;

    let options = config.extract_options(pages);
    let reconstruction = convert_pdf_bytes(&body, &options)?;

    if format == OutputFormat::Json {
        return Ok(json_response(&convert_response(reconstruction))?);
    }

    let body = render_attachment(&reconstruction, format)?;
    let mut response = Response::from_bytes(body)?;
    response
        .headers_mut()
        .set("Content-Type", format.content_type())?;
    response.headers_mut().set(
        "Content-Disposition",
        &format!("attachment; filename=\"{filename}\""),
    )?;
    response.headers_mut().set("Cache-Control", "no-store")?;
    Ok(response)
}

fn json_response<T>(payload: &T) -> Result<Response>
where
    T: Serialize,
{
    let mut response = Response::from_json(payload)?;
    response.headers_mut().set("Cache-Control", "no-store")?;
    Ok(response)
}

fn parse_query(req: &Request) -> Result<HashMap<String, String>, ApiError> {
    let url = req.url()?;
    let query = url
        .query_pairs()
        .map(|(key, value)| (key.to_string(), value.to_string()))
        .collect::<HashMap<_, _>>();
    Ok(query)
}

pub fn parse_format_query(query: &HashMap<String, String>) -> Result<OutputFormat, ApiError> {
    let Some(raw) = query.get("format") else {
        return Ok(OutputFormat::default());
    };
    raw.parse::<OutputFormat>().map_err(ApiError::BadRequest)
}

pub fn parse_pages_query(
    query: &HashMap<String, String>,
) -> Result<Option<PageSelection>, ApiError> {
    let Some(raw) = query.get("pages").filter(|raw| !raw.trim().is_empty()) else {
        return Ok(None);
    };
    raw.parse::<PageSelection>()
        .map(Some)
        .map_err(|error| ApiError::BadRequest(format!("invalid pages parameter: {error}")))
}

/// Builds a header-safe download filename from the uploaded file's name,
/// with the extension of `format`.
pub fn attachment_filename(requested: Option<&str>, format: OutputFormat) -> String {
    let requested = requested.unwrap_or_default().trim();
    let stem = requested
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default();
    let stem = stem
        .strip_suffix(".pdf")
        .or_else(|| stem.strip_suffix(".PDF"))
        .or_else(|| stem.strip_suffix(&format!(".{}", format.extension())))
        .unwrap_or(stem);
    let cleaned = stem
        .chars()
        .filter(|ch| ch.is_ascii_alphanumeric() || matches!(ch, '-' | '_' | '.'))
        .collect::<String>();
    let cleaned = cleaned.trim_matches('.');

    let stem = if cleaned.is_empty() {
        DEFAULT_FILENAME_STEM
    } else {
        cleaned
    };
    format!("{stem}.{}", format.extension())
}
