// ja4lens/src/query_api.rs
//
// Query API: length-prefixed JSON over TCP.
//
// Lets a front end (web UI, SIEM enrichment job, gateway) ask the engine
// without linking it:
//
//   search   { fingerprint }  → AggregatedResult | not_found
//   suggest  { q }            → [Suggestion]   (q shorter than 2 chars → [])
//   detect   { fingerprint }  → family | not_found
//   parse    { fingerprint }  → ParsedJa4 | not_found
//   stats                     → DbStats
//
// Frame format (both directions):
//   [4 bytes little-endian length] [JSON payload]
//
// Bind address defaults to 127.0.0.1:50051. One task per connection; the
// store is shared read-only so connections never contend.

use std::sync::Arc;

use anyhow::Result;
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, info, warn};

use crate::model::{AggregatedResult, FingerprintFamily, ParsedJa4, Suggestion};
use crate::state::db::{DbStats, FingerprintDb};

pub const MAX_FRAME: usize = 1_048_576;

// ── Wire types ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum QueryRequest {
    Search  { fingerprint: String },
    Suggest { q: String },
    Detect  { fingerprint: String },
    Parse   { fingerprint: String },
    Stats,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "status", content = "data", rename_all = "snake_case")]
pub enum QueryResponse {
    Found(Box<AggregatedResult>),
    Suggestions(Vec<Suggestion>),
    Family(FingerprintFamily),
    Parsed(ParsedJa4),
    Stats(DbStats),
    NotFound,
    Error(String),
}

// ── Framing ───────────────────────────────────────────────────────────────────

/// Read one frame. `Ok(None)` on clean EOF before a length prefix.
pub async fn read_frame<R: AsyncRead + Unpin>(r: &mut R) -> Result<Option<Vec<u8>>> {
    let mut len_buf = [0u8; 4];
    match r.read_exact(&mut len_buf).await {
        Ok(_) => {}
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(e.into()),
    }
    let len = u32::from_le_bytes(len_buf) as usize;
    if len > MAX_FRAME {
        anyhow::bail!("frame too large: {} bytes", len);
    }
    let mut body = vec![0u8; len];
    r.read_exact(&mut body).await?;
    Ok(Some(body))
}

pub async fn write_frame<W: AsyncWrite + Unpin>(w: &mut W, payload: &[u8]) -> Result<()> {
    if payload.len() > MAX_FRAME {
        anyhow::bail!("frame too large: {} bytes", payload.len());
    }
    w.write_all(&(payload.len() as u32).to_le_bytes()).await?;
    w.write_all(payload).await?;
    w.flush().await?;
    Ok(())
}

// ── Server ────────────────────────────────────────────────────────────────────

pub struct QueryServer {
    db: Arc<FingerprintDb>,
}

impl QueryServer {
    pub fn new(db: Arc<FingerprintDb>) -> Self {
        Self { db }
    }

    pub async fn serve(self: Arc<Self>, listener: TcpListener) -> Result<()> {
        info!("Query API listening on {}", listener.local_addr()?);

        loop {
            let (stream, peer) = listener.accept().await?;
            let srv = Arc::clone(&self);
            tokio::spawn(async move {
                if let Err(e) = srv.handle_connection(stream).await {
                    warn!("Query API connection error from {}: {}", peer, e);
                }
            });
        }
    }

    async fn handle_connection(&self, mut stream: TcpStream) -> Result<()> {
        while let Some(body) = read_frame(&mut stream).await? {
            let resp = match serde_json::from_slice::<QueryRequest>(&body) {
                Ok(req) => self.handle(req),
                Err(e) => QueryResponse::Error(format!("bad request: {e}")),
            };
            let resp_bytes = serde_json::to_vec(&resp)?;
            write_frame(&mut stream, &resp_bytes).await?;
        }
        Ok(())
    }

    pub fn handle(&self, req: QueryRequest) -> QueryResponse {
        debug!("query {:?}", req);
        match req {
            QueryRequest::Search { fingerprint } => match self.db.search(&fingerprint) {
                Some(r) => QueryResponse::Found(Box::new(r)),
                None    => QueryResponse::NotFound,
            },
            QueryRequest::Suggest { q } => QueryResponse::Suggestions(self.db.suggest(&q)),
            QueryRequest::Detect { fingerprint } => match self.db.detect(&fingerprint) {
                Some(f) => QueryResponse::Family(f),
                None    => QueryResponse::NotFound,
            },
            QueryRequest::Parse { fingerprint } => match self.db.parse_display(&fingerprint) {
                Some(p) => QueryResponse::Parsed(p),
                None    => QueryResponse::NotFound,
            },
            QueryRequest::Stats => QueryResponse::Stats(self.db.stats()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Record;

    const H: &str = "t13d1516h2_8daaf6152771_02713d6af862";

    fn server() -> Arc<QueryServer> {
        let db = FingerprintDb::from_records(vec![Record {
            application:     Some("curl".into()),
            verified:        true,
            ja4_fingerprint: Some(H.into()),
            ..Default::default()
        }]);
        Arc::new(QueryServer::new(Arc::new(db)))
    }

    #[test]
    fn request_wire_shape() {
        let req: QueryRequest = serde_json::from_str(r#"{"op":"suggest","q":"t1"}"#).unwrap();
        assert!(matches!(req, QueryRequest::Suggest { ref q } if q == "t1"));
        let stats: QueryRequest = serde_json::from_str(r#"{"op":"stats"}"#).unwrap();
        assert!(matches!(stats, QueryRequest::Stats));
    }

    #[test]
    fn handle_maps_engine_results() {
        let srv = server();
        match srv.handle(QueryRequest::Search { fingerprint: H.into() }) {
            QueryResponse::Found(r) => assert_eq!(r.match_count, 1),
            other => panic!("unexpected {other:?}"),
        }
        assert!(matches!(srv.handle(QueryRequest::Search { fingerprint: "nope".into() }), QueryResponse::NotFound));
        assert!(matches!(srv.handle(QueryRequest::Suggest { q: "t".into() }), QueryResponse::Suggestions(v) if v.is_empty()));
        assert!(matches!(srv.handle(QueryRequest::Detect { fingerprint: H.into() }), QueryResponse::Family(FingerprintFamily::Ja4)));
        assert!(matches!(srv.handle(QueryRequest::Parse { fingerprint: "zzz".into() }), QueryResponse::NotFound));
        assert!(matches!(srv.handle(QueryRequest::Stats), QueryResponse::Stats(s) if s.total_records == 1));
    }

    #[tokio::test]
    async fn round_trip_over_tcp() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(server().serve(listener));

        let mut conn = TcpStream::connect(addr).await.unwrap();
        for (req, expect) in [
            (format!(r#"{{"op":"search","fingerprint":"{H}"}}"#), "found"),
            (r#"{"op":"suggest","q":"T13"}"#.to_string(), "suggestions"),
            (r#"{"op":"search","fingerprint":"garbage"}"#.to_string(), "not_found"),
            ("{not json".to_string(), "error"),
        ] {
            write_frame(&mut conn, req.as_bytes()).await.unwrap();
            let body = read_frame(&mut conn).await.unwrap().unwrap();
            let v: serde_json::Value = serde_json::from_slice(&body).unwrap();
            assert_eq!(v["status"], expect, "{req}");
            if expect == "suggestions" {
                assert_eq!(v["data"][0]["hash"], H);
                assert_eq!(v["data"][0]["type"], "ja4");
            }
        }
    }

    #[tokio::test]
    async fn oversized_frame_is_rejected() {
        let (mut a, mut b) = tokio::io::duplex(64);
        tokio::spawn(async move {
            let _ = a.write_all(&((MAX_FRAME as u32) + 1).to_le_bytes()).await;
        });
        assert!(read_frame(&mut b).await.is_err());
    }
}
