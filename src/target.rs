//! Targets receive the finished report.

use anyhow::anyhow;
use async_trait::async_trait;
use reqwest::{header, Client};
use std::collections::HashMap;
use std::io::{self, Write};
use tracing::{debug, info};

use crate::config::{InfluxDbParams, Target, TargetParams};
use crate::error::{Error, Result};
use crate::format;
use crate::report::Report;

#[async_trait]
pub trait TargetHandler: Send + Sync {
    async fn emit(&self, target: &Target, report: &Report) -> Result<()>;
}

/// Target handlers keyed by the `type` tag used in the configuration.
pub struct TargetRegistry {
    handlers: HashMap<String, Box<dyn TargetHandler>>,
}

impl TargetRegistry {
    pub fn empty() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }

    pub fn builtin() -> Self {
        let mut registry = Self::empty();
        registry.register("stdout", StdoutTarget);
        registry.register("influxdb", InfluxDbTarget::new());
        registry
    }

    pub fn register(&mut self, kind: &str, handler: impl TargetHandler + 'static) {
        self.handlers.insert(kind.to_string(), Box::new(handler));
    }

    pub async fn dispatch(&self, target: &Target, report: &Report) -> Result<()> {
        let handler = self
            .handlers
            .get(&target.kind)
            .ok_or_else(|| Error::UnknownTargetType {
                target_name: target.name.clone(),
                kind: target.kind.clone(),
            })?;
        handler.emit(target, report).await
    }
}

/// Emit the report to every target in order. Stops at the first failure.
pub async fn emit_all(targets: &[Target], report: &Report, registry: &TargetRegistry) -> Result<()> {
    for target in targets {
        info!(target_name = %target.name, kind = %target.kind, entries = report.len(), "emitting report");
        registry.dispatch(target, report).await?;
    }
    Ok(())
}

pub struct StdoutTarget;

impl StdoutTarget {
    fn write_to(out: &mut impl Write, target: &Target, report: &Report) -> Result<()> {
        let written = if report.is_empty() {
            Ok(())
        } else {
            writeln!(out, "{}", format::format_console(report))
        };
        written
            .and_then(|()| out.flush())
            .map_err(|e| Error::target_failed(&target.name, e))
    }
}

#[async_trait]
impl TargetHandler for StdoutTarget {
    async fn emit(&self, target: &Target, report: &Report) -> Result<()> {
        Self::write_to(&mut io::stdout().lock(), target, report)
    }
}

/// Writes points through the InfluxDB v2 HTTP write API.
pub struct InfluxDbTarget {
    client: Client,
}

impl InfluxDbTarget {
    pub fn new() -> Self {
        Self {
            client: Client::new(),
        }
    }

    async fn write(&self, params: &InfluxDbParams, payload: String) -> anyhow::Result<()> {
        let url = format!("{}/api/v2/write", params.url.trim_end_matches('/'));

        let response = self
            .client
            .post(&url)
            .query(&[
                ("org", params.org.as_str()),
                ("bucket", params.bucket.as_str()),
                ("precision", "ns"),
            ])
            .header(header::AUTHORIZATION, format!("Token {}", params.token))
            .header(header::CONTENT_TYPE, "text/plain; charset=utf-8")
            .body(payload)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        let body = response.text().await.unwrap_or_default();
        Err(anyhow!("InfluxDB write to {url} returned {status}: {}", body.trim()))
    }
}

impl Default for InfluxDbTarget {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TargetHandler for InfluxDbTarget {
    async fn emit(&self, target: &Target, report: &Report) -> Result<()> {
        let TargetParams::InfluxDb(params) = &target.params else {
            return Err(Error::target_failed(
                &target.name,
                anyhow!("missing InfluxDB connection parameters"),
            ));
        };

        if report.is_empty() {
            debug!(target_name = %target.name, "nothing to write");
            return Ok(());
        }

        let payload = format::format_line_protocol(report);
        debug!(target_name = %target.name, %payload, "writing line protocol");

        self.write(params, payload)
            .await
            .map_err(|e| Error::target_failed(&target.name, e))?;

        info!(target_name = %target.name, bucket = %params.bucket, points = report.len(), "wrote points");
        Ok(())
    }
}
