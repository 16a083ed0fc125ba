use std::path::Path;
use std::time::Duration;

use reqwest::Url;
use reqwest::blocking::{Client, multipart};
use reqwest::header::LOCATION;

use super::{BridgeError, BridgeStep, HttpReply, HttpStream, Transport};
use crate::foundation::error::{StickerError, StickerResult};

const USER_AGENT: &str = concat!("stickerize/", env!("CARGO_PKG_VERSION"));

/// Blocking `reqwest` transport. Every request carries the configured timeout.
pub struct HttpTransport {
    /// Used for the upload, whose redirect is the success signal and must not be followed.
    no_redirect: Client,
    client: Client,
}

impl HttpTransport {
    pub fn new(timeout: Duration) -> StickerResult<Self> {
        let build = |redirect: reqwest::redirect::Policy| {
            Client::builder()
                .user_agent(USER_AGENT)
                .timeout(timeout)
                .connect_timeout(timeout)
                .redirect(redirect)
                .build()
                .map_err(|e| StickerError::config(format!("failed to build HTTP client: {e}")))
        };
        Ok(Self {
            no_redirect: build(reqwest::redirect::Policy::none())?,
            client: build(reqwest::redirect::Policy::default())?,
        })
    }
}

impl Transport for HttpTransport {
    fn upload(&self, url: &Url, field: &str, file: &Path) -> Result<HttpReply, BridgeError> {
        let form = multipart::Form::new()
            .file(field.to_string(), file)
            .map_err(|e| BridgeError::Transport {
                step: BridgeStep::Upload,
                msg: format!("read '{}': {e}", file.display()),
            })?;
        let resp = self
            .no_redirect
            .post(url.clone())
            .multipart(form)
            .send()
            .map_err(|e| send_error(BridgeStep::Upload, e))?;

        Ok(HttpReply {
            status: resp.status().as_u16(),
            location: resp
                .headers()
                .get(LOCATION)
                .and_then(|v| v.to_str().ok())
                .map(str::to_owned),
            body: String::new(),
        })
    }

    fn post_form(
        &self,
        url: &Url,
        query: &[(&str, &str)],
        form: &[(&str, &str)],
    ) -> Result<HttpReply, BridgeError> {
        let resp = self
            .client
            .post(url.clone())
            .query(query)
            .form(form)
            .send()
            .map_err(|e| send_error(BridgeStep::Trigger, e))?;
        let status = resp.status().as_u16();
        let location = resp
            .headers()
            .get(LOCATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned);
        let body = resp
            .text()
            .map_err(|e| send_error(BridgeStep::Trigger, e))?;
        Ok(HttpReply {
            status,
            location,
            body,
        })
    }

    fn get(&self, url: &Url) -> Result<HttpStream, BridgeError> {
        let resp = self
            .client
            .get(url.clone())
            .send()
            .map_err(|e| send_error(BridgeStep::Download, e))?;
        Ok(HttpStream {
            status: resp.status().as_u16(),
            body: Box::new(resp),
        })
    }
}

fn send_error(step: BridgeStep, e: reqwest::Error) -> BridgeError {
    if e.is_timeout() {
        BridgeError::Timeout { step }
    } else {
        BridgeError::Transport {
            step,
            msg: e.to_string(),
        }
    }
}
