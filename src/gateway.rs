//! Broker order gateway
//!
//! [`OrderGateway`] is the seam between signal generation and a broker.
//! Requests carry signed units (negative for shorts) and prices rounded to
//! the instrument's quote precision. [`PaperGateway`] keeps everything in
//! memory for dry runs.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::info;

use crate::order::STANDARD_LOT_UNITS;
use crate::{Instrument, Order, OrderSide};

#[derive(Debug, Error, PartialEq)]
pub enum GatewayError {
    #[error("units must be positive, got {0}")]
    NonPositiveUnits(f64),

    #[error("{0:?} order requires a price")]
    MissingPrice(OrderKind),

    #[error("unknown order id: {0}")]
    UnknownOrder(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderKind {
    Market,
    Limit,
    Stop,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderRequest {
    pub instrument: Instrument,
    pub side: OrderSide,
    /// Unsigned size; the sign is applied by [`OrderRequest::signed_units`]
    pub units: f64,
    pub kind: OrderKind,
    pub price: Option<f64>,
    pub take_profit: Option<f64>,
    pub stop_loss: Option<f64>,
}

impl OrderRequest {
    pub fn market(instrument: Instrument, side: OrderSide, units: f64) -> Self {
        Self {
            instrument,
            side,
            units,
            kind: OrderKind::Market,
            price: None,
            take_profit: None,
            stop_loss: None,
        }
    }

    pub fn limit(instrument: Instrument, side: OrderSide, units: f64, price: f64) -> Self {
        Self {
            kind: OrderKind::Limit,
            price: Some(price),
            ..Self::market(instrument, side, units)
        }
    }

    pub fn stop(instrument: Instrument, side: OrderSide, units: f64, price: f64) -> Self {
        Self {
            kind: OrderKind::Stop,
            price: Some(price),
            ..Self::market(instrument, side, units)
        }
    }

    /// Broker request for a simulated order, sized in standard lots.
    ///
    /// Pending orders become stop orders resting at their entry; filled
    /// ones are sent at market.
    pub fn from_order(order: &Order, instrument: &Instrument, lots: f64) -> Self {
        let units = (lots * STANDARD_LOT_UNITS).round();
        let request = if order.is_pending() {
            Self::stop(instrument.clone(), order.side(), units, order.entry())
        } else {
            Self::market(instrument.clone(), order.side(), units)
        };
        Self {
            take_profit: order.take_profit(),
            stop_loss: order.stop_loss(),
            ..request
        }
    }

    pub fn with_take_profit(mut self, price: f64) -> Self {
        self.take_profit = Some(price);
        self
    }

    pub fn with_stop_loss(mut self, price: f64) -> Self {
        self.stop_loss = Some(price);
        self
    }

    /// Units as the broker expects them: negative for shorts
    pub fn signed_units(&self) -> f64 {
        self.units * self.side.direction()
    }

    pub fn validate(&self) -> Result<(), GatewayError> {
        if self.units <= 0.0 {
            return Err(GatewayError::NonPositiveUnits(self.units));
        }
        if self.kind != OrderKind::Market && self.price.is_none() {
            return Err(GatewayError::MissingPrice(self.kind));
        }
        Ok(())
    }

    /// Copy with every price rounded to the instrument's quote precision
    pub fn rounded(&self) -> Self {
        let round = |p: Option<f64>| p.map(|p| self.instrument.round_price(p));
        Self {
            price: round(self.price),
            take_profit: round(self.take_profit),
            stop_loss: round(self.stop_loss),
            ..self.clone()
        }
    }
}

pub trait OrderGateway {
    /// Submit an order, returning the broker's order id
    fn place_order(&mut self, request: &OrderRequest) -> Result<String, GatewayError>;

    fn cancel_order(&mut self, id: &str) -> Result<(), GatewayError>;

    /// Orders resting at the broker, by id
    fn pending_orders(&self) -> Vec<(String, OrderRequest)>;
}

/// In-memory gateway: limit and stop orders rest until cancelled, market
/// orders are recorded as executed immediately
#[derive(Debug, Default)]
pub struct PaperGateway {
    next_id: u64,
    pending: BTreeMap<u64, OrderRequest>,
    executed: Vec<(String, OrderRequest)>,
}

impl PaperGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn executed(&self) -> &[(String, OrderRequest)] {
        &self.executed
    }
}

impl OrderGateway for PaperGateway {
    fn place_order(&mut self, request: &OrderRequest) -> Result<String, GatewayError> {
        request.validate()?;
        let request = request.rounded();

        self.next_id += 1;
        let id = self.next_id;

        info!(
            "PAPER {:?} #{} {} {} units @ {:?} (TP {:?}, SL {:?})",
            request.kind,
            id,
            request.instrument,
            request.signed_units(),
            request.price,
            request.take_profit,
            request.stop_loss
        );

        match request.kind {
            OrderKind::Market => self.executed.push((id.to_string(), request)),
            OrderKind::Limit | OrderKind::Stop => {
                self.pending.insert(id, request);
            }
        }
        Ok(id.to_string())
    }

    fn cancel_order(&mut self, id: &str) -> Result<(), GatewayError> {
        let removed = id
            .parse::<u64>()
            .ok()
            .and_then(|key| self.pending.remove(&key));

        match removed {
            Some(_) => {
                info!("PAPER cancelled #{}", id);
                Ok(())
            }
            None => Err(GatewayError::UnknownOrder(id.to_string())),
        }
    }

    fn pending_orders(&self) -> Vec<(String, OrderRequest)> {
        self.pending
            .iter()
            .map(|(id, request)| (id.to_string(), request.clone()))
            .collect()
    }
}
