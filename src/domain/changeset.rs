use super::order::{Order, OrderStatus};
use super::payment::{Payment, PaymentStatus};
use super::proof::PaymentProof;
use super::tournament::{Registration, RegistrationStatus, Tournament, TournamentStatus};

/// Precondition a row must satisfy for a write to apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expect<S> {
    /// The row must not exist yet.
    Absent,
    /// The row must exist with this status.
    Status(S),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Write {
    Order {
        order: Order,
        expect: Expect<OrderStatus>,
    },
    Payment {
        payment: Payment,
        expect: Expect<PaymentStatus>,
    },
    Proof(PaymentProof),
    Tournament {
        tournament: Tournament,
        expect: Expect<TournamentStatus>,
    },
    Registration {
        registration: Registration,
        expect: Expect<RegistrationStatus>,
        /// When set, an insert fails once this many active registrations exist.
        capacity: Option<u32>,
    },
}

/// Writes that a `Store` applies all together or not at all.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Changeset {
    writes: Vec<Write>,
}

impl Changeset {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_order(mut self, order: Order) -> Self {
        self.writes.push(Write::Order {
            order,
            expect: Expect::Absent,
        });
        self
    }

    pub fn update_order(mut self, order: Order, from: OrderStatus) -> Self {
        self.writes.push(Write::Order {
            order,
            expect: Expect::Status(from),
        });
        self
    }

    pub fn insert_payment(mut self, payment: Payment) -> Self {
        self.writes.push(Write::Payment {
            payment,
            expect: Expect::Absent,
        });
        self
    }

    pub fn update_payment(mut self, payment: Payment, from: PaymentStatus) -> Self {
        self.writes.push(Write::Payment {
            payment,
            expect: Expect::Status(from),
        });
        self
    }

    pub fn insert_proof(mut self, proof: PaymentProof) -> Self {
        self.writes.push(Write::Proof(proof));
        self
    }

    pub fn insert_tournament(mut self, tournament: Tournament) -> Self {
        self.writes.push(Write::Tournament {
            tournament,
            expect: Expect::Absent,
        });
        self
    }

    pub fn update_tournament(mut self, tournament: Tournament, from: TournamentStatus) -> Self {
        self.writes.push(Write::Tournament {
            tournament,
            expect: Expect::Status(from),
        });
        self
    }

    pub fn insert_registration(mut self, registration: Registration, capacity: Option<u32>) -> Self {
        self.writes.push(Write::Registration {
            registration,
            expect: Expect::Absent,
            capacity,
        });
        self
    }

    pub fn update_registration(
        mut self,
        registration: Registration,
        from: RegistrationStatus,
    ) -> Self {
        self.writes.push(Write::Registration {
            registration,
            expect: Expect::Status(from),
            capacity: None,
        });
        self
    }

    pub fn writes(&self) -> &[Write] {
        &self.writes
    }

    pub fn into_writes(self) -> Vec<Write> {
        self.writes
    }

    pub fn is_empty(&self) -> bool {
        self.writes.is_empty()
    }
}
