use crate::error::ServerError;
use crate::handler::{Flow, Handler, HandlerResult};
use crate::http::mime::{has_media_type, APPLICATION_JSON, APPLICATION_X_WWW_FORM_URLENCODED};
use crate::http::{Request, Response};
use futures::future::BoxFuture;
use serde_json::{Map, Value};

/// Fills `req.body` from an `application/json` body.
#[derive(Clone, Copy, Debug, Default)]
pub struct JsonBody;

pub fn json() -> JsonBody {
    JsonBody
}

impl JsonBody {
    async fn parse(&self, req: &mut Request) -> HandlerResult {
        if req.raw_body.is_empty() || !has_media_type(req.header("content-type"), APPLICATION_JSON) {
            return Ok(Flow::Next);
        }

        let text = String::from_utf8_lossy(&req.raw_body).into_owned();
        let parsed: Value = serde_json::from_str(&text)?;
        req.body_text = Some(text);
        req.body = Some(parsed);
        Ok(Flow::Next)
    }
}

impl Handler for JsonBody {
    fn call<'a>(&'a self, req: &'a mut Request, _res: &'a mut Response) -> BoxFuture<'a, HandlerResult> {
        Box::pin(self.parse(req))
    }
}

/// Fills `req.body` with an object from an urlencoded form body. Repeated
/// keys collect into an array.
#[derive(Clone, Copy, Debug, Default)]
pub struct UrlEncodedBody;

pub fn urlencoded() -> UrlEncodedBody {
    UrlEncodedBody
}

impl UrlEncodedBody {
    async fn parse(&self, req: &mut Request) -> HandlerResult {
        if req.raw_body.is_empty()
            || !has_media_type(req.header("content-type"), APPLICATION_X_WWW_FORM_URLENCODED)
        {
            return Ok(Flow::Next);
        }

        let text = String::from_utf8_lossy(&req.raw_body).into_owned();
        let form = parse_urlencoded(&text)?;
        req.body_text = Some(text);
        req.body = Some(Value::Object(form));
        Ok(Flow::Next)
    }
}

impl Handler for UrlEncodedBody {
    fn call<'a>(&'a self, req: &'a mut Request, _res: &'a mut Response) -> BoxFuture<'a, HandlerResult> {
        Box::pin(self.parse(req))
    }
}

fn parse_urlencoded(text: &str) -> Result<Map<String, Value>, ServerError> {
    let mut form = Map::new();

    for pair in text.split('&').filter(|s| !s.is_empty()) {
        let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
        let key = decode_component(key)?;
        let value = Value::String(decode_component(value)?);

        match form.get_mut(&key) {
            Some(Value::Array(values)) => values.push(value),
            Some(previous) => {
                let first = previous.take();
                *previous = Value::Array(vec![first, value]);
            }
            None => {
                form.insert(key, value);
            }
        }
    }

    Ok(form)
}

fn decode_component(raw: &str) -> Result<String, ServerError> {
    let spaced = raw.replace('+', " ");
    urlencoding::decode(&spaced)
        .map(|decoded| decoded.into_owned())
        .map_err(|_| ServerError::BadRequest(format!("malformed form component: {}", raw)))
}
