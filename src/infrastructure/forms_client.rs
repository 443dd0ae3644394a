//! 表单 API 客户端 - 基础设施层
//!
//! 只暴露"创建 / 批量更新 / 查询 / 删除"四种能力，不认识选区和题目

use crate::config::Config;
use crate::error::ApiError;
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde_json::{json, Value as JsonValue};
use std::time::Duration;
use tracing::debug;

/// 新建表单的返回
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatedForm {
    pub form_id: String,
    pub responder_uri: Option<String>,
}

/// 远程文档 API
#[async_trait]
pub trait FormsApi: Send + Sync {
    /// 新建表单
    async fn create_form(&self, title: &str) -> Result<CreatedForm, ApiError>;

    /// 作为一个整体提交一批修改
    async fn batch_update(&self, form_id: &str, body: &JsonValue) -> Result<JsonValue, ApiError>;

    /// 查询表单当前状态
    async fn get_form(&self, form_id: &str) -> Result<JsonValue, ApiError>;

    /// 删除表单
    async fn delete_form(&self, form_id: &str) -> Result<(), ApiError>;
}

/// 基于 HTTP 的表单 API 客户端
pub struct FormsClient {
    http: Client,
    forms_base_url: String,
    drive_base_url: String,
    token: String,
}

impl FormsClient {
    /// 创建新的客户端
    pub fn new(config: &Config) -> Result<Self, ApiError> {
        let http = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| ApiError::Rejected {
                endpoint: "client".to_string(),
                status: None,
                message: e.to_string(),
            })?;

        Ok(Self {
            http,
            forms_base_url: config.forms_api_base_url.trim_end_matches('/').to_string(),
            drive_base_url: config.drive_api_base_url.trim_end_matches('/').to_string(),
            token: config.forms_access_token.clone(),
        })
    }

    /// 发送请求并按状态码归类错误
    async fn send(&self, endpoint: &str, request: RequestBuilder) -> Result<reqwest::Response, ApiError> {
        let response = request
            .bearer_auth(&self.token)
            .send()
            .await
            .map_err(|e| classify_transport_error(endpoint, e))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        debug!("{} 返回 {}: {}", endpoint, status, body);
        Err(ApiError::from_status(endpoint, status.as_u16(), body))
    }

    /// 读取 JSON 响应体，无法解析时返回 Null
    async fn json_or_null(response: reqwest::Response) -> JsonValue {
        response.json::<JsonValue>().await.unwrap_or(JsonValue::Null)
    }
}

#[async_trait]
impl FormsApi for FormsClient {
    async fn create_form(&self, title: &str) -> Result<CreatedForm, ApiError> {
        let url = format!("{}/forms", self.forms_base_url);
        let body = json!({ "info": { "title": title } });
        let response = self.send("forms.create", self.http.post(&url).json(&body)).await?;
        let result = Self::json_or_null(response).await;

        let form_id = result
            .get("formId")
            .and_then(|v| v.as_str())
            .ok_or_else(|| ApiError::UnexpectedReplyShape {
                label: "forms.create".to_string(),
                detail: format!("缺少 formId: {}", result),
            })?
            .to_string();

        Ok(CreatedForm {
            form_id,
            responder_uri: result
                .get("responderUri")
                .and_then(|v| v.as_str())
                .map(str::to_string),
        })
    }

    async fn batch_update(&self, form_id: &str, body: &JsonValue) -> Result<JsonValue, ApiError> {
        let url = format!("{}/forms/{}:batchUpdate", self.forms_base_url, form_id);
        debug!("batchUpdate Payload: {}", body);
        let response = self.send("forms.batchUpdate", self.http.post(&url).json(body)).await?;
        let result = Self::json_or_null(response).await;
        debug!("batchUpdate 结果: {}", result);
        Ok(result)
    }

    async fn get_form(&self, form_id: &str) -> Result<JsonValue, ApiError> {
        let url = format!("{}/forms/{}", self.forms_base_url, form_id);
        let response = self.send("forms.get", self.http.get(&url)).await?;
        Ok(Self::json_or_null(response).await)
    }

    async fn delete_form(&self, form_id: &str) -> Result<(), ApiError> {
        let url = format!("{}/files/{}", self.drive_base_url, form_id);
        self.send("drive.files.delete", self.http.delete(&url)).await?;
        Ok(())
    }
}

/// 超时与连接失败可重试，其余传输错误不可重试
fn classify_transport_error(endpoint: &str, err: reqwest::Error) -> ApiError {
    if err.is_timeout() || err.is_connect() {
        ApiError::Transient {
            endpoint: endpoint.to_string(),
            status: None,
            message: err.to_string(),
        }
    } else {
        ApiError::Rejected {
            endpoint: endpoint.to_string(),
            status: err.status().map(|s| s.as_u16()),
            message: err.to_string(),
        }
    }
}

/// 编辑链接
pub fn edit_url(form_id: &str) -> String {
    format!("https://docs.google.com/forms/d/{}/edit", form_id)
}

/// 公开填写链接
pub fn view_url(form_id: &str) -> String {
    format!("https://docs.google.com/forms/d/{}/viewform", form_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_urls() {
        assert_eq!(edit_url("abc"), "https://docs.google.com/forms/d/abc/edit");
        assert_eq!(view_url("abc"), "https://docs.google.com/forms/d/abc/viewform");
    }

    #[test]
    fn test_client_trims_base_urls() {
        let config = Config {
            forms_api_base_url: "http://localhost:9/v1/".to_string(),
            ..Config::default()
        };
        let client = FormsClient::new(&config).unwrap();
        assert_eq!(client.forms_base_url, "http://localhost:9/v1");
    }

    #[tokio::test]
    async fn test_unreachable_host_is_transient() {
        let config = Config {
            forms_api_base_url: "http://127.0.0.1:9".to_string(),
            request_timeout_secs: 2,
            ..Config::default()
        };
        let client = FormsClient::new(&config).unwrap();
        let err = client.get_form("missing").await.unwrap_err();
        assert!(err.is_transient(), "{:?}", err);
    }
}
