use std::path::Path;
use std::time::Duration;

use aws_config::BehaviorVersion;
use aws_credential_types::Credentials;
use aws_sdk_s3::presigning::PresigningConfig;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;

use crate::core::config::Settings;

#[derive(Debug, Clone)]
pub(crate) struct UploadedObject {
    pub(crate) url: String,
    pub(crate) signed_url: String,
}

#[derive(Debug, Clone)]
pub(crate) struct StorageService {
    client: Client,
    bucket: String,
    endpoint: String,
}

impl StorageService {
    pub(crate) async fn from_settings(settings: &Settings) -> anyhow::Result<Option<Self>> {
        if settings.s3().access_key.is_empty() || settings.s3().secret_key.is_empty() {
            return Ok(None);
        }

        let creds = Credentials::new(
            settings.s3().access_key.clone(),
            settings.s3().secret_key.clone(),
            None,
            None,
            "redpen-static",
        );

        let config = aws_config::defaults(BehaviorVersion::latest())
            .endpoint_url(settings.s3().endpoint.clone())
            .region(aws_config::Region::new(settings.s3().region.clone()))
            .credentials_provider(creds)
            .load()
            .await;

        let client = Client::new(&config);

        Ok(Some(Self {
            client,
            bucket: settings.s3().bucket.clone(),
            endpoint: settings.s3().endpoint.trim_end_matches('/').to_string(),
        }))
    }

    /// Uploads a local file under a fresh UUID key and returns both the
    /// plain object URL and a time-limited signed GET URL.
    pub(crate) async fn upload_file(
        &self,
        path: &Path,
        content_type: &str,
        expires_in: Duration,
    ) -> anyhow::Result<UploadedObject> {
        let extension = path.extension().and_then(|ext| ext.to_str()).unwrap_or("bin");
        let key = format!("media/{}.{extension}", uuid::Uuid::new_v4());

        let body = ByteStream::from_path(path).await?;
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(&key)
            .content_type(content_type)
            .body(body)
            .send()
            .await?;

        let signed_url = self.presign_get(&key, expires_in).await?;
        let url = format!("{}/{}/{key}", self.endpoint, self.bucket);

        Ok(UploadedObject { url, signed_url })
    }

    pub(crate) async fn presign_get(
        &self,
        key: &str,
        expires_in: Duration,
    ) -> anyhow::Result<String> {
        let presigned = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .presigned(PresigningConfig::expires_in(expires_in)?)
            .await?;

        Ok(presigned.uri().to_string())
    }
}
