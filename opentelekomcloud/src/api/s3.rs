//! S3-compatible object storage (OBS) with AWS Signature Version 4

use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};
use url::Url;

use super::{ApiError, Client};

type HmacSha256 = Hmac<Sha256>;

const ALGORITHM: &str = "AWS4-HMAC-SHA256";
const SERVICE: &str = "s3";
const SIGNED_HEADERS: &str = "host;x-amz-content-sha256;x-amz-date";

#[derive(Clone)]
pub struct S3Credentials {
    pub access_key: String,
    pub secret_key: String,
}

impl std::fmt::Debug for S3Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("S3Credentials")
            .field("access_key", &self.access_key)
            .field("secret_key", &"<redacted>")
            .finish()
    }
}

/// Headers produced by signing one request
#[derive(Debug, Clone, PartialEq)]
pub struct SignedHeaders {
    pub authorization: String,
    pub amz_date: String,
    pub content_sha256: String,
}

pub fn sha256_hex(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}

fn hmac(key: &[u8], data: &[u8]) -> Result<Vec<u8>, ApiError> {
    let mut mac = HmacSha256::new_from_slice(key)
        .map_err(|e| ApiError::ParseError(format!("invalid signing key: {}", e)))?;
    mac.update(data);
    Ok(mac.finalize().into_bytes().to_vec())
}

pub fn signing_key(
    secret_key: &str,
    date_stamp: &str,
    region: &str,
    service: &str,
) -> Result<Vec<u8>, ApiError> {
    let k_date = hmac(format!("AWS4{}", secret_key).as_bytes(), date_stamp.as_bytes())?;
    let k_region = hmac(&k_date, region.as_bytes())?;
    let k_service = hmac(&k_region, service.as_bytes())?;
    hmac(&k_service, b"aws4_request")
}

fn canonical_query(url: &Url) -> String {
    let mut pairs: Vec<(String, String)> = url
        .query_pairs()
        .map(|(k, v)| {
            (
                urlencoding::encode(&k).into_owned(),
                urlencoding::encode(&v).into_owned(),
            )
        })
        .collect();
    pairs.sort();
    pairs
        .into_iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join("&")
}

fn host_header(url: &Url) -> String {
    let host = url.host_str().unwrap_or_default();
    match url.port() {
        Some(port) => format!("{}:{}", host, port),
        None => host.to_string(),
    }
}

/// Sign a request for the `s3` service
pub fn sign_request(
    method: &str,
    url: &Url,
    payload: &[u8],
    credentials: &S3Credentials,
    region: &str,
    now: DateTime<Utc>,
) -> Result<SignedHeaders, ApiError> {
    let amz_date = now.format("%Y%m%dT%H%M%SZ").to_string();
    let date_stamp = now.format("%Y%m%d").to_string();
    let content_sha256 = sha256_hex(payload);

    let canonical_headers = format!(
        "host:{}\nx-amz-content-sha256:{}\nx-amz-date:{}\n",
        host_header(url),
        content_sha256,
        amz_date
    );
    let canonical_request = format!(
        "{}\n{}\n{}\n{}\n{}\n{}",
        method,
        url.path(),
        canonical_query(url),
        canonical_headers,
        SIGNED_HEADERS,
        content_sha256
    );

    let scope = format!("{}/{}/{}/aws4_request", date_stamp, region, SERVICE);
    let string_to_sign = format!(
        "{}\n{}\n{}\n{}",
        ALGORITHM,
        amz_date,
        scope,
        sha256_hex(canonical_request.as_bytes())
    );

    let key = signing_key(&credentials.secret_key, &date_stamp, region, SERVICE)?;
    let signature = hex::encode(hmac(&key, string_to_sign.as_bytes())?);

    Ok(SignedHeaders {
        authorization: format!(
            "{} Credential={}/{}, SignedHeaders={}, Signature={}",
            ALGORITHM, credentials.access_key, scope, SIGNED_HEADERS, signature
        ),
        amz_date,
        content_sha256,
    })
}

/// Path-style S3 client
#[derive(Clone)]
pub struct S3Client {
    client: Client,
    credentials: S3Credentials,
    region: String,
}

impl S3Client {
    pub fn new(client: Client, credentials: S3Credentials, region: &str) -> Self {
        Self {
            client,
            credentials,
            region: region.to_string(),
        }
    }

    pub fn bucket_url(&self, bucket: &str, subresource: &str) -> Result<Url, ApiError> {
        let raw = format!(
            "{}/{}?{}",
            self.client.base_url(),
            urlencoding::encode(bucket),
            subresource
        );
        Url::parse(&raw).map_err(|e| ApiError::ParseError(format!("invalid S3 URL {}: {}", raw, e)))
    }

    async fn send(
        &self,
        method: reqwest::Method,
        url: &Url,
        payload: Vec<u8>,
    ) -> Result<reqwest::Response, ApiError> {
        let path = url.path().to_string();
        let signed = sign_request(
            method.as_str(),
            url,
            &payload,
            &self.credentials,
            &self.region,
            Utc::now(),
        )?;
        tracing::debug!("{} request to: {}", method, url);

        self.client
            .send_with_retry(
                || {
                    self.client
                        .http_client()
                        .request(method.clone(), url.clone())
                        .header("Authorization", signed.authorization.as_str())
                        .header("x-amz-date", signed.amz_date.as_str())
                        .header("x-amz-content-sha256", signed.content_sha256.as_str())
                        .body(payload.clone())
                        .send()
                },
                &path,
            )
            .await
    }

    /// PUT /{bucket}?policy
    pub async fn put_bucket_policy(&self, bucket: &str, policy: &str) -> Result<(), ApiError> {
        let url = self.bucket_url(bucket, "policy")?;
        self.send(reqwest::Method::PUT, &url, policy.as_bytes().to_vec())
            .await
            .map(|_| ())
    }

    /// GET /{bucket}?policy
    pub async fn get_bucket_policy(&self, bucket: &str) -> Result<String, ApiError> {
        let url = self.bucket_url(bucket, "policy")?;
        let response = self.send(reqwest::Method::GET, &url, Vec::new()).await?;
        Ok(response.text().await?)
    }

    /// DELETE /{bucket}?policy
    pub async fn delete_bucket_policy(&self, bucket: &str) -> Result<(), ApiError> {
        let url = self.bucket_url(bucket, "policy")?;
        self.send(reqwest::Method::DELETE, &url, Vec::new())
            .await
            .map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::test_helpers::create_test_client;
    use chrono::TimeZone;
    use mockito::{Matcher, Server};

    fn credentials() -> S3Credentials {
        S3Credentials {
            access_key: "AKIDEXAMPLE".to_string(),
            secret_key: "wJalrXUtnFEMI/K7MDENG+bPxRfiCYEXAMPLEKEY".to_string(),
        }
    }

    #[test]
    fn signing_key_matches_published_derivation() {
        let key = signing_key(
            "wJalrXUtnFEMI/K7MDENG+bPxRfiCYEXAMPLEKEY",
            "20120215",
            "us-east-1",
            "iam",
        )
        .unwrap();
        assert_eq!(
            hex::encode(key),
            "f4780e2d9f65fa895f9c67b32ce1baf0b0d8a43505a000a1a9e090d414db404d"
        );
    }

    #[test]
    fn authorization_header_has_scope_and_signature() {
        let url = Url::parse("https://obs.eu-de.otc.t-systems.com/my-bucket?policy").unwrap();
        let now = Utc.with_ymd_and_hms(2024, 3, 1, 12, 30, 0).unwrap();
        let signed = sign_request("GET", &url, b"", &credentials(), "eu-de", now).unwrap();

        assert_eq!(signed.amz_date, "20240301T123000Z");
        assert_eq!(
            signed.content_sha256,
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
        assert!(signed.authorization.starts_with(
            "AWS4-HMAC-SHA256 Credential=AKIDEXAMPLE/20240301/eu-de/s3/aws4_request, SignedHeaders=host;x-amz-content-sha256;x-amz-date, Signature="
        ));
        let signature = signed.authorization.rsplit('=').next().unwrap();
        assert_eq!(signature.len(), 64);
        assert!(signature.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn authorization_header_matches_known_signatures() {
        let now = Utc.with_ymd_and_hms(2024, 3, 1, 12, 30, 0).unwrap();
        let prefix = "AWS4-HMAC-SHA256 Credential=AKIDEXAMPLE/20240301/eu-de/s3/aws4_request, SignedHeaders=host;x-amz-content-sha256;x-amz-date, Signature=";

        let url = Url::parse("https://obs.eu-de.otc.t-systems.com/my-bucket?policy").unwrap();
        let signed = sign_request("GET", &url, b"", &credentials(), "eu-de", now).unwrap();
        assert_eq!(
            signed.authorization,
            format!(
                "{}3cbfc3805fc945242e9c9612990d1f78cb0406cba734f024f4fdc72fd8ed4d57",
                prefix
            )
        );

        let body = br#"{"Version":"2008-10-17","Statement":[]}"#;
        let signed = sign_request("PUT", &url, body, &credentials(), "eu-de", now).unwrap();
        assert_eq!(
            signed.authorization,
            format!(
                "{}69c7f1731746c92cf5ef41dd3d452941e80dda3aff591834e5615ba3f8ff9dc1",
                prefix
            )
        );

        // Query pairs are sorted and re-encoded, the port stays in the host header
        let url = Url::parse(
            "http://127.0.0.1:9000/my-bucket?prefix=photos%2F2024%20q1&delimiter=%2F",
        )
        .unwrap();
        let signed = sign_request("GET", &url, b"", &credentials(), "eu-de", now).unwrap();
        assert_eq!(
            signed.authorization,
            format!(
                "{}cd3e5490f613ac92be756d5b7f2a1d4107341e363270b887b38878cdad4e5b2f",
                prefix
            )
        );
    }

    #[test]
    fn signature_depends_on_payload_and_secret() {
        let url = Url::parse("https://obs.eu-de.otc.t-systems.com/my-bucket?policy").unwrap();
        let now = Utc.with_ymd_and_hms(2024, 3, 1, 12, 30, 0).unwrap();

        let a = sign_request("PUT", &url, b"{}", &credentials(), "eu-de", now).unwrap();
        let b = sign_request("PUT", &url, b"{}", &credentials(), "eu-de", now).unwrap();
        let c = sign_request("PUT", &url, b"{ }", &credentials(), "eu-de", now).unwrap();
        let other_secret = S3Credentials {
            secret_key: "another".to_string(),
            ..credentials()
        };
        let d = sign_request("PUT", &url, b"{}", &other_secret, "eu-de", now).unwrap();

        assert_eq!(a, b);
        assert_ne!(a.authorization, c.authorization);
        assert_ne!(a.authorization, d.authorization);
    }

    #[tokio::test]
    async fn put_bucket_policy_sends_signed_body() {
        let mut server = Server::new_async().await;
        let policy = r#"{"Version":"2008-10-17","Statement":[]}"#;
        let m = server
            .mock("PUT", "/my-bucket")
            .match_query(Matcher::Regex("policy".to_string()))
            .match_header("authorization", Matcher::Regex("^AWS4-HMAC-SHA256 ".to_string()))
            .match_header("x-amz-content-sha256", sha256_hex(policy.as_bytes()).as_str())
            .match_body(policy)
            .with_status(204)
            .create_async()
            .await;

        let s3 = S3Client::new(create_test_client(&server.url()), credentials(), "eu-de");
        s3.put_bucket_policy("my-bucket", policy).await.unwrap();
        m.assert_async().await;
    }

    #[tokio::test]
    async fn xml_error_code_is_extracted() {
        let mut server = Server::new_async().await;
        let _m = server
            .mock("GET", "/missing")
            .match_query(Matcher::Any)
            .with_status(404)
            .with_header("content-type", "application/xml")
            .with_body("<?xml version=\"1.0\"?><Error><Code>NoSuchBucket</Code><Message>The specified bucket does not exist</Message></Error>")
            .create_async()
            .await;

        let s3 = S3Client::new(create_test_client(&server.url()), credentials(), "eu-de");
        let err = s3.get_bucket_policy("missing").await.unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(err.error_code(), Some("NoSuchBucket"));
    }
}
