use crate::config::BoardConfig;
use crate::errors::ClientError;
use crate::models::{
    AnalysisResponse, CreateTemplateRequest, DailyTemplate, DailyToggleRequest, HabitKind, HabitRef,
    PeriodAddRequest, PeriodHabit, PeriodItemRequest, PeriodKind, Snapshot,
};
use chrono::NaiveDate;
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use tracing::{debug, error};

/// The CRUD surface the dashboard persists through.
#[allow(async_fn_in_trait)]
pub trait HabitApi {
    async fn fetch_snapshot(&self) -> Result<Snapshot, ClientError>;

    async fn create_daily_template(
        &self,
        name: &str,
        start_date: Option<NaiveDate>,
    ) -> Result<DailyTemplate, ClientError>;

    /// The server soft-deletes by setting `endDate` to its today.
    async fn delete_daily_template(&self, id: i64) -> Result<(), ClientError>;

    /// Flips the completion behind `target` on the server.
    async fn toggle(&self, target: &HabitRef) -> Result<(), ClientError>;

    async fn add_period_habit(
        &self,
        kind: PeriodKind,
        key: &str,
        name: &str,
    ) -> Result<PeriodHabit, ClientError>;

    async fn delete_period_habit(&self, kind: PeriodKind, key: &str, id: i64) -> Result<(), ClientError>;

    async fn analysis(&self, scope: &str, year: Option<i32>) -> Result<AnalysisResponse, ClientError>;
}

/// [`HabitApi`] over HTTP + JSON.
#[derive(Debug, Clone)]
pub struct HttpApi {
    client: Client,
    base_url: String,
}

impl HttpApi {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn from_config(config: &BoardConfig) -> Self {
        Self::new(config.api_url.clone())
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response, ClientError> {
        let response = request.send().await.inspect_err(|err| {
            error!("request failed: {err}");
        })?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let message = response.text().await.unwrap_or_default();
        let message = if message.is_empty() {
            status.canonical_reason().unwrap_or("request failed").to_string()
        } else {
            message
        };
        error!(status = status.as_u16(), "server rejected request: {message}");
        Err(ClientError::Server {
            status: status.as_u16(),
            message,
        })
    }

    async fn send_json<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, ClientError> {
        let response = self.send(request).await?;
        Ok(response.json().await?)
    }
}

impl HabitApi for HttpApi {
    async fn fetch_snapshot(&self) -> Result<Snapshot, ClientError> {
        debug!("loading snapshot from {}", self.base_url);
        self.send_json(self.client.get(self.url("/api/data"))).await
    }

    async fn create_daily_template(
        &self,
        name: &str,
        start_date: Option<NaiveDate>,
    ) -> Result<DailyTemplate, ClientError> {
        let body = CreateTemplateRequest {
            name: name.to_string(),
            start_date,
        };
        self.send_json(self.client.post(self.url("/api/daily/template")).json(&body))
            .await
    }

    async fn delete_daily_template(&self, id: i64) -> Result<(), ClientError> {
        let url = self.url(&format!("/api/daily/template/{id}"));
        self.send(self.client.delete(url)).await?;
        Ok(())
    }

    async fn toggle(&self, target: &HabitRef) -> Result<(), ClientError> {
        let request = match target.kind {
            HabitKind::Daily => {
                let body = DailyToggleRequest {
                    date_key: target.key.clone(),
                    template_id: target.id,
                };
                self.client.post(self.url("/api/daily/toggle")).json(&body)
            }
            HabitKind::Period(kind) => {
                let body = PeriodItemRequest {
                    key: target.key.clone(),
                    id: target.id,
                };
                self.client
                    .post(self.url(&format!("/api/{kind}/toggle")))
                    .json(&body)
            }
        };
        self.send(request).await?;
        Ok(())
    }

    async fn add_period_habit(
        &self,
        kind: PeriodKind,
        key: &str,
        name: &str,
    ) -> Result<PeriodHabit, ClientError> {
        let body = PeriodAddRequest {
            key: key.to_string(),
            name: name.to_string(),
        };
        self.send_json(self.client.post(self.url(&format!("/api/{kind}/add"))).json(&body))
            .await
    }

    async fn delete_period_habit(&self, kind: PeriodKind, key: &str, id: i64) -> Result<(), ClientError> {
        let body = PeriodItemRequest {
            key: key.to_string(),
            id,
        };
        self.send(self.client.post(self.url(&format!("/api/{kind}/delete"))).json(&body))
            .await?;
        Ok(())
    }

    async fn analysis(&self, scope: &str, year: Option<i32>) -> Result<AnalysisResponse, ClientError> {
        let mut query = vec![("scope", scope.to_string())];
        if let Some(year) = year {
            query.push(("year", year.to_string()));
        }
        self.send_json(self.client.get(self.url("/api/analysis")).query(&query))
            .await
    }
}
