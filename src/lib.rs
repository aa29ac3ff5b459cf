/*
 * 5D Labs Agent Platform - Kubernetes Orchestrator for AI Coding Agents
 * Copyright (C) 2025 5D Labs
 *
 * This program is free software: you can redistribute it and/or modify
 * it under the terms of the GNU Affero General Public License as published
 * by the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 *
 * This program is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
 * GNU Affero General Public License for more details.
 *
 * You should have received a copy of the GNU Affero General Public License
 * along with this program. If not, see <https://www.gnu.org/licenses/>.
 */

#![allow(clippy::missing_errors_doc, clippy::missing_panics_doc, clippy::doc_markdown)]

//! Webhook-driven CI gate for GitOps Kubernetes configuration repositories.
//!
//! A pull/merge request against an Argo-CD-style config repo lands here as a
//! webhook; the gate resolves which `Application`/`ApplicationSet` objects
//! it affects, renders and checks their manifests, and reports the result
//! back to the VCS as a status check and a progressively-updated comment.

pub mod comment;
pub mod config;
pub mod error;
pub mod model;
pub mod pipeline;
pub mod queue;
pub mod repo;
pub mod request_entry;
pub mod resolver;
pub mod server;
pub mod vcs;

pub use config::GateConfig;
pub use error::{GateError, GateResult};
pub use request_entry::RequestEntry;
