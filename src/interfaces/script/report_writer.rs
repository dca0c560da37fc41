use crate::domain::order::Order;
use crate::domain::payment::Payment;
use crate::domain::proof::PaymentProof;
use crate::domain::tournament::{Registration, Tournament};
use crate::error::{MarketError, Result};
use serde::Serialize;
use std::io::Write;

/// One report row: what a script line did, or why it failed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Outcome {
    pub line: usize,
    pub command: String,
    /// `ok`, or the error kind.
    pub outcome: String,
    pub entity: String,
    pub id: String,
    pub status: String,
    pub detail: String,
}

impl Outcome {
    fn ok(line: usize, command: &str, entity: &str, id: String, status: &str, detail: String) -> Self {
        Self {
            line,
            command: command.to_string(),
            outcome: "ok".to_string(),
            entity: entity.to_string(),
            id,
            status: status.to_string(),
            detail,
        }
    }

    pub fn failed(line: usize, command: &str, err: &MarketError) -> Self {
        Self {
            line,
            command: command.to_string(),
            outcome: err.kind().to_string(),
            entity: String::new(),
            id: String::new(),
            status: String::new(),
            detail: err.to_string(),
        }
    }

    pub fn order(line: usize, command: &str, order: &Order) -> Self {
        Self::ok(
            line,
            command,
            "order",
            order.code.clone(),
            order.status.as_str(),
            format!("{} {}", order.total_amount, order.currency),
        )
    }

    pub fn payment(line: usize, command: &str, payment: &Payment) -> Self {
        Self::ok(
            line,
            command,
            "payment",
            payment.reference.clone(),
            payment.status.as_str(),
            format!("{} {} via {}", payment.amount, payment.currency, payment.method),
        )
    }

    pub fn proof(line: usize, command: &str, proof: &PaymentProof) -> Self {
        Self::ok(
            line,
            command,
            "proof",
            proof.sha256.to_string(),
            proof.mime.as_str(),
            format!("{} bytes", proof.size_bytes),
        )
    }

    /// The access code never reaches the report.
    pub fn tournament(line: usize, command: &str, tournament: &Tournament) -> Self {
        Self::ok(
            line,
            command,
            "tournament",
            tournament.id.to_string(),
            tournament.status.as_str(),
            tournament.title.clone(),
        )
    }

    pub fn registration(line: usize, command: &str, registration: &Registration) -> Self {
        Self::ok(
            line,
            command,
            "registration",
            registration.id.to_string(),
            registration.status.as_str(),
            match &registration.team {
                Some(team) => format!("{} team {}", registration.tournament_id, team.name),
                None => registration.tournament_id.to_string(),
            },
        )
    }

    /// A query result. `status` carries the row count for listings.
    pub fn summary(line: usize, command: &str, entity: &str, status: &str, detail: String) -> Self {
        Self::ok(line, command, entity, String::new(), status, detail)
    }
}

/// Writes outcomes as CSV with a header row.
pub struct ReportWriter<W: Write> {
    writer: csv::Writer<W>,
}

impl<W: Write> ReportWriter<W> {
    pub fn new(sink: W) -> Self {
        Self {
            writer: csv::Writer::from_writer(sink),
        }
    }

    pub fn write(&mut self, outcome: &Outcome) -> Result<()> {
        self.writer.serialize(outcome)?;
        Ok(())
    }

    pub fn flush(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }
}
