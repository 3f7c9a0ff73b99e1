use http::{Method, StatusCode};
use micro_httpc::transport::Connector;
use micro_httpc::{HttpsContext, Response, TlsConnector};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info};

use crate::bucket::Bucket;
use crate::config::ThingConfig;
use crate::error::ThingError;

const JSON: &str = "application/json";
const THING_REGISTRATION: &str = "application/vnd.kii.ThingRegistrationAndAuthorizationRequest+json";

#[derive(Debug, Serialize)]
struct ThingRegistration<'a> {
    #[serde(rename = "_vendorThingID")]
    vendor_thing_id: &'a str,
    #[serde(rename = "_password")]
    password: &'a str,
    #[serde(rename = "_thingType", skip_serializing_if = "Option::is_none")]
    thing_type: Option<&'a str>,
}

/// A thing as returned by its registration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RegisteredThing {
    #[serde(rename = "_thingID")]
    pub thing_id: String,
    #[serde(rename = "_vendorThingID", default)]
    pub vendor_thing_id: Option<String>,
    #[serde(rename = "_accessToken", default)]
    pub access_token: Option<String>,
}

/// The identity the server gave a newly created object.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CreatedObject {
    #[serde(rename = "objectID")]
    pub object_id: String,
    #[serde(rename = "createdAt", default)]
    pub created_at: Option<i64>,
}

struct Payload<'a> {
    content_type: &'a str,
    bytes: &'a [u8],
}

/// Registers things and manages bucket objects, one request at a time.
///
/// Every operation comes in two halves: a `prepare_*` method building the request
/// into the underlying [`HttpsContext`], and an async method preparing and
/// executing it. The prepared request can be inspected through
/// [`context`](Self::context) before it is driven.
pub struct ThingClient<C> {
    context: HttpsContext<C>,
    config: ThingConfig,
    access_token: Option<String>,
}

impl<C> std::fmt::Debug for ThingClient<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ThingClient")
            .field("context", &self.context)
            .field("config", &self.config)
            .field("authorized", &self.access_token.is_some())
            .finish()
    }
}

impl ThingClient<TlsConnector> {
    pub fn tls(config: ThingConfig) -> Result<Self, ThingError> {
        let context = HttpsContext::tls(config.driver())?;
        Ok(Self { context, config, access_token: None })
    }
}

impl<C: Connector> ThingClient<C> {
    pub fn new(connector: C, config: ThingConfig) -> Self {
        let context = HttpsContext::new(connector, config.driver());
        Self { context, config, access_token: None }
    }

    /// Sets the token sent as `Authorization: Bearer` with every following request.
    pub fn set_access_token<S: Into<String>>(&mut self, token: Option<S>) {
        self.access_token = token.map(Into::into);
    }

    pub fn access_token(&self) -> Option<&str> {
        self.access_token.as_deref()
    }

    pub fn context(&self) -> &HttpsContext<C> {
        &self.context
    }

    /// The response of the last executed request.
    pub fn response(&self) -> Option<Response<'_>> {
        self.context.response()
    }

    pub fn prepare_register_thing(&mut self, vendor_thing_id: &str, password: &str, thing_type: Option<&str>) -> Result<(), ThingError> {
        non_empty("vendor thing id", vendor_thing_id)?;
        non_empty("password", password)?;

        let body = serde_json::to_vec(&ThingRegistration { vendor_thing_id, password, thing_type })?;
        let path = format!("api/apps/{}/things", self.config.app_id());
        self.prepare(Method::POST, &path, &[], Some(Payload { content_type: THING_REGISTRATION, bytes: &body }))
    }

    pub fn prepare_create_object<T: Serialize + ?Sized>(&mut self, bucket: &Bucket, object: &T) -> Result<(), ThingError> {
        check_bucket(bucket)?;
        let body = serde_json::to_vec(object)?;
        let path = bucket.objects_path(self.config.app_id()).to_string();
        self.prepare(Method::POST, &path, &[], Some(Payload { content_type: JSON, bytes: &body }))
    }

    pub fn prepare_create_object_with_id<T: Serialize + ?Sized>(&mut self, bucket: &Bucket, object_id: &str, object: &T) -> Result<(), ThingError> {
        let path = self.object_path(bucket, object_id)?;
        let body = serde_json::to_vec(object)?;
        self.prepare(Method::PUT, &path, &[], Some(Payload { content_type: JSON, bytes: &body }))
    }

    /// Prepares a partial update, sent as a `POST` overridden to `PATCH`.
    pub fn prepare_patch_object<T: Serialize + ?Sized>(&mut self, bucket: &Bucket, object_id: &str, patch: &T, etag: Option<&str>) -> Result<(), ThingError> {
        let path = self.object_path(bucket, object_id)?;
        let body = serde_json::to_vec(patch)?;
        let mut headers = vec![("X-HTTP-Method-Override", "PATCH")];
        headers.extend(etag.map(|etag| ("If-Match", etag)));
        self.prepare(Method::POST, &path, &headers, Some(Payload { content_type: JSON, bytes: &body }))
    }

    pub fn prepare_replace_object<T: Serialize + ?Sized>(&mut self, bucket: &Bucket, object_id: &str, object: &T, etag: Option<&str>) -> Result<(), ThingError> {
        let path = self.object_path(bucket, object_id)?;
        let body = serde_json::to_vec(object)?;
        let headers: Vec<_> = etag.map(|etag| ("If-Match", etag)).into_iter().collect();
        self.prepare(Method::PUT, &path, &headers, Some(Payload { content_type: JSON, bytes: &body }))
    }

    pub fn prepare_get_object(&mut self, bucket: &Bucket, object_id: &str) -> Result<(), ThingError> {
        let path = self.object_path(bucket, object_id)?;
        self.prepare(Method::GET, &path, &[], None)
    }

    pub fn prepare_delete_object(&mut self, bucket: &Bucket, object_id: &str) -> Result<(), ThingError> {
        let path = self.object_path(bucket, object_id)?;
        self.prepare(Method::DELETE, &path, &[], None)
    }

    /// Registers a thing and keeps its access token for the following requests.
    pub async fn register_thing(&mut self, vendor_thing_id: &str, password: &str, thing_type: Option<&str>) -> Result<RegisteredThing, ThingError> {
        self.prepare_register_thing(vendor_thing_id, password, thing_type)?;
        self.send().await?;

        let thing: RegisteredThing = serde_json::from_slice(self.body())?;
        info!(thing_id = %thing.thing_id, "thing registered");
        if thing.access_token.is_some() {
            self.access_token.clone_from(&thing.access_token);
        }
        Ok(thing)
    }

    pub async fn create_object<T: Serialize + ?Sized>(&mut self, bucket: &Bucket, object: &T) -> Result<CreatedObject, ThingError> {
        self.prepare_create_object(bucket, object)?;
        self.send().await?;

        let created: CreatedObject = serde_json::from_slice(self.body())?;
        info!(bucket = %bucket.name(), object_id = %created.object_id, "object created");
        Ok(created)
    }

    pub async fn create_object_with_id<T: Serialize + ?Sized>(&mut self, bucket: &Bucket, object_id: &str, object: &T) -> Result<StatusCode, ThingError> {
        self.prepare_create_object_with_id(bucket, object_id, object)?;
        self.send().await
    }

    pub async fn patch_object<T: Serialize + ?Sized>(&mut self, bucket: &Bucket, object_id: &str, patch: &T, etag: Option<&str>) -> Result<StatusCode, ThingError> {
        self.prepare_patch_object(bucket, object_id, patch, etag)?;
        self.send().await
    }

    pub async fn replace_object<T: Serialize + ?Sized>(&mut self, bucket: &Bucket, object_id: &str, object: &T, etag: Option<&str>) -> Result<StatusCode, ThingError> {
        self.prepare_replace_object(bucket, object_id, object, etag)?;
        self.send().await
    }

    pub async fn get_object(&mut self, bucket: &Bucket, object_id: &str) -> Result<Value, ThingError> {
        self.prepare_get_object(bucket, object_id)?;
        self.send().await?;
        Ok(serde_json::from_slice(self.body())?)
    }

    pub async fn delete_object(&mut self, bucket: &Bucket, object_id: &str) -> Result<StatusCode, ThingError> {
        self.prepare_delete_object(bucket, object_id)?;
        self.send().await
    }

    /// Drives the prepared request to completion and checks for a success status.
    pub async fn send(&mut self) -> Result<StatusCode, ThingError> {
        let head = self.context.execute().await?;
        match head.status() {
            Some(status) if status.is_success() => {
                debug!(status = %status, "request succeeded");
                Ok(status)
            }
            status => Err(ThingError::unexpected_status(status)),
        }
    }

    fn body(&self) -> &[u8] {
        self.context.response().and_then(|response| response.body()).unwrap_or_default()
    }

    fn object_path(&self, bucket: &Bucket, object_id: &str) -> Result<String, ThingError> {
        check_bucket(bucket)?;
        non_empty("object id", object_id)?;
        Ok(bucket.objects_path(self.config.app_id()).object(object_id).to_string())
    }

    fn prepare(&mut self, method: Method, path: &str, headers: &[(&str, &str)], payload: Option<Payload<'_>>) -> Result<(), ThingError> {
        debug!(method = %method, path = %path, "prepare request");
        let context = &mut self.context;
        let config = &self.config;

        context.build_request_line(method, config.app_host(), path)?;
        context.add_header("Host", config.app_host())?;
        context.add_header("X-Kii-AppID", config.app_id())?;
        context.add_header("X-Kii-AppKey", config.app_key())?;
        context.add_header("Connection", "close")?;
        if let Some(token) = &self.access_token {
            context.add_header("Authorization", &format!("Bearer {token}"))?;
        }
        for (key, value) in headers {
            context.add_header(key, value)?;
        }

        match payload {
            Some(payload) => {
                context.add_header("Content-Type", payload.content_type)?;
                context.add_header("Content-Length", &payload.bytes.len().to_string())?;
                context.set_body(Some(payload.bytes))?;
            }
            None => context.set_body(None)?,
        }
        Ok(())
    }
}

fn non_empty(what: &str, value: &str) -> Result<(), ThingError> {
    if value.is_empty() {
        return Err(ThingError::invalid_argument(format!("{what} must not be empty")));
    }
    Ok(())
}

fn check_bucket(bucket: &Bucket) -> Result<(), ThingError> {
    non_empty("bucket name", bucket.name())?;
    if let Some(id) = bucket.scope().id() {
        non_empty("scope id", id)?;
    }
    Ok(())
}
