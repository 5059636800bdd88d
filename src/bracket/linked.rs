//! Linked-triple bracket idiom
//!
//! The entry and both protective legs are submitted as three separate
//! orders correlated by a shared group id embedded in each client order
//! id (`grp-<gid>-main|tp|sl`), so they can be found and cancelled
//! together. Protective legs take the opposite side of the entry.

use serde::Serialize;
use uuid::Uuid;

use crate::policy::Side;

use super::types::BracketIntent;

/// Three linked orders forming one bracket
#[derive(Debug, Clone, Serialize)]
pub struct LinkedBracket {
    pub group_id: Uuid,
    pub main: LinkedOrder,
    pub take_profit: LinkedOrder,
    pub stop_loss: LinkedOrder,
}

/// One leg of a linked bracket
#[derive(Debug, Clone, Serialize)]
pub struct LinkedOrder {
    pub side: String,
    pub product_id: String,
    pub client_order_id: String,
    pub order_configuration: OrderConfiguration,
}

#[derive(Debug, Clone, Serialize)]
pub struct OrderConfiguration {
    pub limit_limit_gtc: LimitGtc,
}

#[derive(Debug, Clone, Serialize)]
pub struct LimitGtc {
    pub base_size: String,
    pub limit_price: String,
    pub post_only: bool,
}

fn leg(
    side: Side,
    product_id: &str,
    group_id: Uuid,
    suffix: &str,
    size: &str,
    price: String,
) -> LinkedOrder {
    let side = match side {
        Side::Long => "BUY",
        Side::Short => "SELL",
    };
    LinkedOrder {
        side: side.to_string(),
        product_id: product_id.to_string(),
        client_order_id: format!("grp-{group_id}-{suffix}"),
        order_configuration: OrderConfiguration {
            limit_limit_gtc: LimitGtc {
                base_size: size.to_string(),
                limit_price: price,
                post_only: false,
            },
        },
    }
}

/// Shape an intent into the linked-triple idiom
pub fn shape_linked(intent: &BracketIntent) -> LinkedBracket {
    let prices = intent.resolve_levels();
    let group_id = Uuid::new_v4();
    let size = intent.size.to_string();
    let opposite = intent.side.opposite();

    LinkedBracket {
        group_id,
        main: leg(
            intent.side,
            &intent.instrument,
            group_id,
            "main",
            &size,
            intent.entry_price.to_string(),
        ),
        take_profit: leg(
            opposite,
            &intent.instrument,
            group_id,
            "tp",
            &size,
            prices.take_profit.to_string(),
        ),
        stop_loss: leg(
            opposite,
            &intent.instrument,
            group_id,
            "sl",
            &size,
            prices.stop_loss.to_string(),
        ),
    }
}
