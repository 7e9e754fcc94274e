// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Prometheus metrics surface.
//!
//! Request counters are updated inline by the middleware with atomic
//! primitives. The store-derived gauges (queue lengths, node counts) are
//! refreshed from the aggregate queries at scrape time, so the cost of a
//! scrape is two GROUP BY queries regardless of table size.

use prometheus::{
    histogram_opts, opts, Encoder, GaugeVec, HistogramVec, IntCounterVec, IntGauge, Registry,
    TextEncoder,
};
use recode_core::job::{JobStatus, Priority, QueueClass};
use recode_core::worker::WorkerStatus;
use recode_store::{JobMetrics, WorkerMetrics};

/// All meters the master exports.
pub struct Metrics {
    registry: Registry,

    pub http_requests: IntCounterVec,
    pub http_request_bytes: IntCounterVec,
    pub http_response_bytes: IntCounterVec,
    pub http_duration_seconds: HistogramVec,
    /// Jobs that waited a full tick with no eligible worker.
    pub jobs_unschedulable: IntCounterVec,

    jobs_total: GaugeVec,
    queue_length: IntGauge,
    queue_by_priority: GaugeVec,
    queue_by_type: GaugeVec,
    nodes_by_status: GaugeVec,
    active_jobs: IntGauge,
    worker_cpu_usage: GaugeVec,
}

impl Metrics {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let http_requests = IntCounterVec::new(
            opts!("recode_http_requests_total", "HTTP requests served"),
            &["method", "endpoint", "status"],
        )?;
        let http_request_bytes = IntCounterVec::new(
            opts!("recode_http_request_bytes_total", "Request body bytes received"),
            &["method", "endpoint", "status"],
        )?;
        let http_response_bytes = IntCounterVec::new(
            opts!("recode_http_response_bytes_total", "Response body bytes sent"),
            &["method", "endpoint", "status"],
        )?;
        let http_duration_seconds = HistogramVec::new(
            histogram_opts!("recode_http_duration_seconds", "Request handling latency"),
            &["method", "endpoint"],
        )?;
        let jobs_unschedulable = IntCounterVec::new(
            opts!("recode_jobs_unschedulable_total", "Scheduler passes that found no eligible worker"),
            &["queue"],
        )?;

        let jobs_total = GaugeVec::new(opts!("recode_jobs_total", "Jobs by state"), &["state"])?;
        let queue_length = IntGauge::new("recode_queue_length", "Jobs waiting in QUEUED")?;
        let queue_by_priority = GaugeVec::new(
            opts!("recode_queue_by_priority", "Queued jobs by priority"),
            &["priority"],
        )?;
        let queue_by_type =
            GaugeVec::new(opts!("recode_queue_by_type", "Queued jobs by queue class"), &["type"])?;
        let nodes_by_status =
            GaugeVec::new(opts!("recode_nodes_by_status", "Workers by status"), &["status"])?;
        let active_jobs = IntGauge::new("recode_active_jobs", "Jobs occupying a worker")?;
        let worker_cpu_usage = GaugeVec::new(
            opts!("recode_worker_cpu_usage", "Last reported CPU usage per worker"),
            &["worker"],
        )?;

        registry.register(Box::new(http_requests.clone()))?;
        registry.register(Box::new(http_request_bytes.clone()))?;
        registry.register(Box::new(http_response_bytes.clone()))?;
        registry.register(Box::new(http_duration_seconds.clone()))?;
        registry.register(Box::new(jobs_unschedulable.clone()))?;
        registry.register(Box::new(jobs_total.clone()))?;
        registry.register(Box::new(queue_length.clone()))?;
        registry.register(Box::new(queue_by_priority.clone()))?;
        registry.register(Box::new(queue_by_type.clone()))?;
        registry.register(Box::new(nodes_by_status.clone()))?;
        registry.register(Box::new(active_jobs.clone()))?;
        registry.register(Box::new(worker_cpu_usage.clone()))?;

        Ok(Self {
            registry,
            http_requests,
            http_request_bytes,
            http_response_bytes,
            http_duration_seconds,
            jobs_unschedulable,
            jobs_total,
            queue_length,
            queue_by_priority,
            queue_by_type,
            nodes_by_status,
            active_jobs,
            worker_cpu_usage,
        })
    }

    /// Record a worker's self-reported CPU usage (heartbeat payload).
    pub fn record_worker_cpu(&self, worker: &str, cpu_percent: f64) {
        self.worker_cpu_usage.with_label_values(&[worker]).set(cpu_percent);
    }

    /// Refresh the store-derived gauges.
    pub fn set_aggregates(&self, jobs: &JobMetrics, workers: &WorkerMetrics) {
        let by_state = jobs.total_by_state();
        for state in JobStatus::ALL {
            self.jobs_total
                .with_label_values(&[state.as_str()])
                .set(by_state.get(&state).copied().unwrap_or(0) as f64);
        }
        self.queue_length.set(jobs.queue_length());
        let by_priority = jobs.queued_by_priority();
        for priority in Priority::ALL {
            self.queue_by_priority
                .with_label_values(&[priority.as_str()])
                .set(by_priority.get(&priority).copied().unwrap_or(0) as f64);
        }
        let by_class = jobs.queued_by_class();
        for class in QueueClass::ALL {
            self.queue_by_type
                .with_label_values(&[class.as_str()])
                .set(by_class.get(&class).copied().unwrap_or(0) as f64);
        }
        for status in WorkerStatus::ALL {
            self.nodes_by_status
                .with_label_values(&[status.as_str()])
                .set(workers.by_status.get(&status).copied().unwrap_or(0) as f64);
        }
        self.active_jobs.set(jobs.active_jobs());
    }

    /// Encode everything in Prometheus text format.
    pub fn render(&self) -> String {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        if let Err(e) = encoder.encode(&self.registry.gather(), &mut buffer) {
            tracing::error!(error = %e, "metrics encoding failed");
            return String::new();
        }
        String::from_utf8(buffer).unwrap_or_default()
    }
}

#[cfg(test)]
#[path = "metrics_tests.rs"]
mod tests;
