use std::time::Duration;

use ias_net::{Headers, Net, NetError, NetExt};
use url::Url;

// Mock Net implementation that responds after a fixed delay
struct SlowNet {
    delay: Duration,
}

#[async_trait::async_trait]
impl Net for SlowNet {
    async fn get_bytes(
        &self,
        _url: Url,
        _headers: Option<Headers>,
    ) -> Result<bytes::Bytes, NetError> {
        tokio::time::sleep(self.delay).await;
        Ok(bytes::Bytes::from("success"))
    }
}

#[tokio::test]
async fn timeout_expires_for_slow_response() {
    let net = SlowNet {
        delay: Duration::from_secs(60),
    }
    .with_timeout(Duration::from_millis(10));

    let url = Url::parse("http://example.com/ad/1.json").unwrap();
    let result = net.get_bytes(url, None).await;

    assert!(matches!(result, Err(NetError::Timeout)));
}

#[tokio::test]
async fn fast_response_passes_through() {
    let net = SlowNet {
        delay: Duration::from_millis(1),
    }
    .with_timeout(Duration::from_secs(5));

    let url = Url::parse("http://example.com/ad/1.json").unwrap();
    let bytes = net.get_bytes(url, None).await.unwrap();

    assert_eq!(bytes, bytes::Bytes::from("success"));
}

#[test]
fn timeout_error_is_timeout() {
    assert!(NetError::timeout().is_timeout());
    assert!(!NetError::http_status(404, "http://example.com".into()).is_timeout());
    assert_eq!(
        NetError::http_status(404, "http://example.com".into()).status_code(),
        Some(404)
    );
}
