use std::{fmt::Debug, path::Path, sync::Mutex};

use async_trait::async_trait;
use aws_sdk_s3::{
    error::{ProvideErrorMetadata, SdkError},
    operation::get_object::GetObjectError,
    Client,
};
use log::trace;
use tokio::{fs::File, io::AsyncWriteExt};

use crate::sync::lock;

use super::{object_key, ArchiveClient, ArchiveStats, FetchError, FetchRequest, FetchResult};

const AUTH_ERROR_CODES: &[&str] = &[
    "AccessDenied",
    "InvalidAccessKeyId",
    "SignatureDoesNotMatch",
    "ExpiredToken",
];

/// Archive served from S3. The request host names the bucket.
#[derive(Debug)]
pub struct S3Archive {
    client: Client,
    prefix: String,
    stats: Mutex<ArchiveStats>,
}

impl S3Archive {
    pub async fn new(prefix: String) -> Self {
        let s3_config = aws_config::load_from_env().await;
        let client = Client::new(&s3_config);
        S3Archive::from_client(client, prefix)
    }

    pub fn from_client(client: Client, prefix: String) -> Self {
        S3Archive {
            client,
            prefix,
            stats: Mutex::new(ArchiveStats::new()),
        }
    }

    fn key(&self, request: &FetchRequest) -> String {
        let key = object_key(request);
        if self.prefix.is_empty() {
            key
        } else {
            format!("{}/{key}", self.prefix)
        }
    }

    async fn download(&self, request: &FetchRequest<'_>, temp_path: &Path) -> FetchResult<u64> {
        let key = self.key(request);
        trace!("getting s3://{}/{key}", request.host);

        let response = self
            .client
            .get_object()
            .bucket(request.host)
            .key(&key)
            .send()
            .await
            .map_err(|err| classify_error(request, err))?;

        let mut body = response.body;
        let mut file = File::create(temp_path)
            .await
            .map_err(FetchError::remote_io)?;
        let mut size = 0;

        while let Some(bytes) = body.try_next().await.map_err(FetchError::remote_io)? {
            file.write_all(&bytes)
                .await
                .map_err(FetchError::remote_io)?;
            size += bytes.len() as u64;
        }

        file.sync_all().await.map_err(FetchError::remote_io)?;
        Ok(size)
    }
}

#[async_trait]
impl ArchiveClient for S3Archive {
    async fn fetch(&self, request: &FetchRequest<'_>, temp_path: &Path) -> FetchResult<u64> {
        let result = self.download(request, temp_path).await;
        let size = *result.as_ref().unwrap_or(&0);
        lock(&self.stats).add_fetch(&result, size);
        result
    }

    fn stats(&self) -> ArchiveStats {
        *lock(&self.stats)
    }
}

fn classify_error<R: Debug>(
    request: &FetchRequest,
    error: SdkError<GetObjectError, R>,
) -> FetchError {
    match error {
        SdkError::DispatchFailure(_) | SdkError::TimeoutError(_) => {
            FetchError::network(request, "request could not be sent")
        }
        SdkError::ServiceError(context) => {
            let error = context.into_err();
            if error.is_no_such_key() {
                return FetchError::version_not_found(request);
            }

            match error.code() {
                Some(code) if AUTH_ERROR_CODES.contains(&code) => FetchError::auth(request),
                Some("NoSuchBucket") => FetchError::network(request, "no such bucket"),
                _ => FetchError::remote_io(error),
            }
        }
        error => FetchError::remote_io(error),
    }
}
