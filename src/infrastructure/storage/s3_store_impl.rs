use std::collections::HashMap;

use anyhow::{Context, anyhow};
use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_s3::config::{Credentials, Region};
use aws_sdk_s3::error::{ProvideErrorMetadata, SdkError};
use aws_sdk_s3::operation::create_bucket::CreateBucketError;
use aws_sdk_s3::operation::head_bucket::HeadBucketError;
use aws_sdk_s3::primitives::{ByteStream, DateTime as AwsDateTime};
use aws_sdk_s3::types::{MetadataDirective, Object};
use aws_sdk_s3::Client;
use chrono::{DateTime, Utc};
use futures_util::stream::{self, BoxStream};
use futures_util::{StreamExt, TryStreamExt};

use crate::application::ports::object_store::{
    CREATED_AT_METADATA, Metadata, ObjectAttrs, ObjectStore, ObjectStoreError, ObjectWrite,
};
use crate::bootstrap::config::Config;

pub struct S3ObjectStore {
    client: Client,
    bucket: String,
}

impl S3ObjectStore {
    pub async fn new(cfg: &Config) -> anyhow::Result<Self> {
        let bucket = cfg.storage_bucket.clone();
        if bucket.is_empty() {
            anyhow::bail!("STORAGE_BUCKET must be configured when using the S3 storage backend");
        }

        let mut loader = aws_config::defaults(BehaviorVersion::latest());
        if let Some(region) = &cfg.s3_region {
            loader = loader.region(Region::new(region.clone()));
        }
        let shared_config = loader.load().await;

        let mut builder = aws_sdk_s3::config::Builder::from(&shared_config);
        if let (Some(access), Some(secret)) = (&cfg.s3_access_key, &cfg.s3_secret_key) {
            let creds = Credentials::new(
                access.clone(),
                secret.clone(),
                None,
                None,
                "trus3-s3-static",
            );
            builder = builder.credentials_provider(creds);
        }
        if let Some(endpoint) = &cfg.s3_endpoint {
            builder = builder.endpoint_url(endpoint.clone());
        }
        if cfg.s3_use_path_style {
            builder = builder.force_path_style(true);
        }

        let client = Client::from_conf(builder.build());
        ensure_bucket(&client, &bucket).await?;
        tracing::info!(bucket = %bucket, "s3_object_store_ready");

        Ok(Self { client, bucket })
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    async fn list_page(
        &self,
        prefix: &str,
        token: Option<String>,
    ) -> Result<(Vec<Result<ObjectAttrs, ObjectStoreError>>, Option<Option<String>>), ObjectStoreError>
    {
        let mut req = self
            .client
            .list_objects_v2()
            .bucket(&self.bucket)
            .prefix(prefix);
        if let Some(t) = &token {
            req = req.continuation_token(t);
        }
        let resp = req
            .send()
            .await
            .with_context(|| format!("failed to list objects under {prefix}"))?;
        let page = resp.contents().iter().filter_map(listed_attrs).map(Ok).collect();
        let next = if resp.is_truncated().unwrap_or(false) {
            resp.next_continuation_token().map(|t| Some(t.to_string()))
        } else {
            None
        };
        Ok((page, next))
    }
}

async fn ensure_bucket(client: &Client, bucket: &str) -> anyhow::Result<()> {
    match client.head_bucket().bucket(bucket).send().await {
        Ok(_) => return Ok(()),
        Err(SdkError::ServiceError(service_err)) => {
            if !matches!(service_err.err(), HeadBucketError::NotFound(_)) {
                return Err(anyhow!(service_err.err().to_string()));
            }
        }
        Err(err) => return Err(anyhow!(err.to_string())),
    }

    match client.create_bucket().bucket(bucket).send().await {
        Ok(_) => Ok(()),
        Err(SdkError::ServiceError(service_err)) => match service_err.err() {
            CreateBucketError::BucketAlreadyOwnedByYou(_) => Ok(()),
            CreateBucketError::BucketAlreadyExists(_) => Ok(()),
            other => Err(anyhow!(other.to_string())),
        },
        Err(err) => Err(anyhow!(err.to_string())),
    }
}

fn to_chrono(ts: Option<&AwsDateTime>) -> DateTime<Utc> {
    ts.and_then(|t| DateTime::from_timestamp(t.secs(), t.subsec_nanos()))
        .unwrap_or_else(Utc::now)
}

// S3 metadata travels as ASCII headers
fn encode_metadata(metadata: &Metadata) -> HashMap<String, String> {
    metadata
        .iter()
        .map(|(k, v)| (k.clone(), urlencoding::encode(v).into_owned()))
        .collect()
}

fn decode_metadata(raw: Option<&HashMap<String, String>>) -> Metadata {
    raw.map(|map| {
        map.iter()
            .map(|(k, v)| {
                let value = urlencoding::decode(v)
                    .map(|d| d.into_owned())
                    .unwrap_or_else(|_| v.clone());
                (k.to_ascii_lowercase(), value)
            })
            .collect()
    })
    .unwrap_or_default()
}

fn created_at(metadata: &Metadata, fallback: DateTime<Utc>) -> DateTime<Utc> {
    metadata
        .get(CREATED_AT_METADATA)
        .and_then(|raw| DateTime::parse_from_rfc3339(raw).ok())
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or(fallback)
}

fn listed_attrs(obj: &Object) -> Option<ObjectAttrs> {
    let key = obj.key()?.to_string();
    let updated_at = to_chrono(obj.last_modified());
    Some(ObjectAttrs {
        key,
        size: obj.size().unwrap_or(0),
        content_type: None,
        created_at: updated_at,
        updated_at,
        metadata: Metadata::new(),
        partial: true,
    })
}

fn service_error<E>(key: &str, op: &str, err: SdkError<E>) -> ObjectStoreError
where
    E: ProvideErrorMetadata + std::error::Error + Send + Sync + 'static,
{
    if let SdkError::ServiceError(service_err) = &err {
        if matches!(service_err.err().code(), Some("NoSuchKey") | Some("NotFound")) {
            return ObjectStoreError::NotFound(key.to_string());
        }
    }
    anyhow::Error::from(err)
        .context(format!("{op} failed for {key}"))
        .into()
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    async fn put(
        &self,
        key: &str,
        bytes: Vec<u8>,
        write: &ObjectWrite,
    ) -> Result<ObjectAttrs, ObjectStoreError> {
        let mut req = self
            .client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(ByteStream::from(bytes))
            .set_metadata(Some(encode_metadata(&write.metadata)));
        if !write.content_type.is_empty() {
            req = req.content_type(&write.content_type);
        }
        req.send()
            .await
            .map_err(|err| service_error(key, "put_object", err))?;
        self.stat(key).await
    }

    async fn get(&self, key: &str) -> Result<Vec<u8>, ObjectStoreError> {
        let object = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|err| service_error(key, "get_object", err))?;
        let data = object
            .body
            .collect()
            .await
            .with_context(|| format!("failed to read body of {key}"))?;
        Ok(data.into_bytes().to_vec())
    }

    async fn stat(&self, key: &str) -> Result<ObjectAttrs, ObjectStoreError> {
        let head = match self
            .client
            .head_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
        {
            Ok(head) => head,
            Err(SdkError::ServiceError(service_err)) if service_err.err().is_not_found() => {
                return Err(ObjectStoreError::NotFound(key.to_string()));
            }
            Err(err) => return Err(service_error(key, "head_object", err)),
        };
        let updated_at = to_chrono(head.last_modified());
        let metadata = decode_metadata(head.metadata());
        Ok(ObjectAttrs {
            key: key.to_string(),
            size: head.content_length().unwrap_or(0),
            content_type: head.content_type().map(str::to_string),
            created_at: created_at(&metadata, updated_at),
            updated_at,
            metadata,
            partial: false,
        })
    }

    async fn delete(&self, key: &str) -> Result<(), ObjectStoreError> {
        // DeleteObject succeeds for missing keys, so check first
        self.stat(key).await?;
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|err| service_error(key, "delete_object", err))?;
        Ok(())
    }

    async fn copy(
        &self,
        src_key: &str,
        dst_key: &str,
        refresh: Option<&ObjectWrite>,
    ) -> Result<(), ObjectStoreError> {
        let copy_source = format!("{}/{}", &self.bucket, src_key);
        let mut req = self
            .client
            .copy_object()
            .bucket(&self.bucket)
            .key(dst_key)
            .copy_source(urlencoding::encode(&copy_source));
        if let Some(write) = refresh {
            req = req
                .metadata_directive(MetadataDirective::Replace)
                .set_metadata(Some(encode_metadata(&write.metadata)));
            if !write.content_type.is_empty() {
                req = req.content_type(&write.content_type);
            }
        }
        req.send()
            .await
            .map_err(|err| service_error(src_key, "copy_object", err))?;
        Ok(())
    }

    fn list<'a>(&'a self, prefix: &'a str) -> BoxStream<'a, Result<ObjectAttrs, ObjectStoreError>> {
        // state: Some(token) while pages remain; the first page has no token
        stream::try_unfold(Some(None::<String>), move |state| async move {
            let Some(token) = state else {
                return Ok::<_, ObjectStoreError>(None);
            };
            let (page, next) = self.list_page(prefix, token).await?;
            Ok(Some((stream::iter(page), next)))
        })
        .try_flatten()
        .boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metadata_survives_header_encoding() {
        let mut metadata = Metadata::new();
        metadata.insert("original_name".into(), "résumé 2024.pdf".into());
        let encoded = encode_metadata(&metadata);
        assert!(encoded["original_name"].is_ascii());
        let decoded = decode_metadata(Some(&encoded));
        assert_eq!(decoded, metadata);
    }

    #[test]
    fn created_at_prefers_sidecar_entry() {
        let fallback = Utc::now();
        let mut metadata = Metadata::new();
        assert_eq!(created_at(&metadata, fallback), fallback);
        metadata.insert(CREATED_AT_METADATA.into(), "2024-06-01T10:00:00Z".into());
        assert_eq!(
            created_at(&metadata, fallback).to_rfc3339(),
            "2024-06-01T10:00:00+00:00"
        );
    }

    fn unreachable_store() -> S3ObjectStore {
        let conf = aws_sdk_s3::config::Builder::new()
            .behavior_version(BehaviorVersion::latest())
            .region(Region::new("us-east-1"))
            .credentials_provider(Credentials::new("key", "secret", None, None, "test"))
            .endpoint_url("http://127.0.0.1:9")
            .force_path_style(true)
            .retry_config(aws_sdk_s3::config::retry::RetryConfig::disabled())
            .build();
        S3ObjectStore {
            client: Client::from_conf(conf),
            bucket: "trus3-test".into(),
        }
    }

    #[tokio::test]
    async fn listing_failure_surfaces_once_then_ends() {
        let store = unreachable_store();
        let mut listing = store.list("test/");
        let err = listing.next().await.unwrap().unwrap_err();
        assert!(!err.is_not_found());
        assert!(listing.next().await.is_none());
    }

    #[test]
    fn listing_entries_are_partial() {
        let obj = Object::builder().key("test/a.txt").size(5).build();
        let attrs = listed_attrs(&obj).unwrap();
        assert!(attrs.partial);
        assert_eq!(attrs.size, 5);
        assert!(attrs.content_type.is_none());
    }
}
