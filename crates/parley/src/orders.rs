//! Placeholder order lookups offered to the model.
//!
//! Each handler returns a canned answer; a real deployment would query an
//! order database or fulfilment API behind the same signature.

use async_trait::async_trait;
use chrono::{Duration, Utc};
use serde_json::{json, Value};

use crate::errors::{AgentError, AgentResult};
use crate::models::tool::Tool;
use crate::registry::{ToolFunction, ToolRegistry};

fn order_id(arguments: &Value) -> AgentResult<&str> {
    arguments
        .get("order_id")
        .and_then(Value::as_str)
        .ok_or_else(|| {
            AgentError::InvalidParameters("missing required parameter 'order_id'".to_string())
        })
}

struct GetDeliveryDate;

#[async_trait]
impl ToolFunction for GetDeliveryDate {
    async fn call(&self, arguments: Value) -> AgentResult<String> {
        let _ = order_id(&arguments)?;
        let date = (Utc::now() + Duration::days(2)).date_naive();
        Ok(format!("Will arrive on {}.", date))
    }
}

struct GetOrderStatus;

#[async_trait]
impl ToolFunction for GetOrderStatus {
    async fn call(&self, arguments: Value) -> AgentResult<String> {
        let _ = order_id(&arguments)?;
        Ok("Dispatched".to_string())
    }
}

struct GetOrderShippingAddress;

#[async_trait]
impl ToolFunction for GetOrderShippingAddress {
    async fn call(&self, arguments: Value) -> AgentResult<String> {
        let _ = order_id(&arguments)?;
        Ok("38 avenue John F. Kennedy, L-1855 Luxembourg.".to_string())
    }
}

fn order_id_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "order_id": {
                "type": "string",
                "description": "The customer's order ID."
            }
        },
        "required": ["order_id"],
        "additionalProperties": false
    })
}

/// Build the registry of order-support tools.
pub fn order_registry() -> AgentResult<ToolRegistry> {
    let mut registry = ToolRegistry::new();

    registry.register(
        Tool::new(
            "get_delivery_date",
            "Get the delivery date for a customer's order. Call this whenever you need to know \
             the delivery date, for example when a customer asks 'Where is my package'. Ask the \
             user for their order ID and pass it as the 'order_id' parameter (unless you already \
             have it).",
            order_id_schema(),
        ),
        Box::new(GetDeliveryDate),
    )?;

    registry.register(
        Tool::new(
            "get_order_status",
            "Get the current fulfilment status for a customer's order.",
            order_id_schema(),
        ),
        Box::new(GetOrderStatus),
    )?;

    registry.register(
        Tool::new(
            "get_order_shipping_address",
            "Get the shipping address on file for a customer's order.",
            order_id_schema(),
        ),
        Box::new(GetOrderShippingAddress),
    )?;

    Ok(registry)
}
