// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Per-request metadata recorded alongside decrypt attempts.

use std::convert::Infallible;
use std::net::SocketAddr;

use axum::{
    extract::{ConnectInfo, FromRequestParts},
    http::{header::USER_AGENT, request::Parts, HeaderMap},
};

pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Request id, caller IP and user agent. Every field is best effort.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestMeta {
    pub request_id: Option<String>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

impl RequestMeta {
    fn from_parts(parts: &Parts) -> Self {
        let peer = parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip().to_string());

        Self {
            request_id: header_value(&parts.headers, REQUEST_ID_HEADER),
            ip_address: client_ip(&parts.headers).or(peer),
            user_agent: header_value(&parts.headers, USER_AGENT.as_str()),
        }
    }
}

impl<S: Send + Sync> FromRequestParts<S> for RequestMeta {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self::from_parts(parts))
    }
}

fn header_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// First hop of `X-Forwarded-For`, then `X-Real-IP`.
fn client_ip(headers: &HeaderMap) -> Option<String> {
    header_value(headers, "x-forwarded-for")
        .and_then(|list| {
            list.split(',')
                .map(str::trim)
                .find(|hop| !hop.is_empty())
                .map(str::to_string)
        })
        .or_else(|| header_value(headers, "x-real-ip"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    fn parts(headers: &[(&str, &str)]) -> Parts {
        let mut builder = Request::builder().uri("/v1/pii/decrypt");
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        builder.body(()).unwrap().into_parts().0
    }

    #[test]
    fn reads_all_headers() {
        let meta = RequestMeta::from_parts(&parts(&[
            ("x-request-id", "req-42"),
            ("user-agent", "admin-portal/1.0"),
            ("x-forwarded-for", "203.0.113.7, 10.0.0.1"),
        ]));
        assert_eq!(meta.request_id.as_deref(), Some("req-42"));
        assert_eq!(meta.user_agent.as_deref(), Some("admin-portal/1.0"));
        assert_eq!(meta.ip_address.as_deref(), Some("203.0.113.7"));
    }

    #[test]
    fn falls_back_to_real_ip_then_peer() {
        let meta = RequestMeta::from_parts(&parts(&[("x-real-ip", "198.51.100.2")]));
        assert_eq!(meta.ip_address.as_deref(), Some("198.51.100.2"));

        let mut p = parts(&[]);
        p.extensions
            .insert(ConnectInfo(SocketAddr::from(([192, 0, 2, 1], 5555))));
        let meta = RequestMeta::from_parts(&p);
        assert_eq!(meta.ip_address.as_deref(), Some("192.0.2.1"));
    }

    #[test]
    fn missing_headers_are_none() {
        let meta = RequestMeta::from_parts(&parts(&[("x-forwarded-for", " , ")]));
        assert_eq!(meta, RequestMeta::default());
    }
}
