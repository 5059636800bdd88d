//! On-fill bracket idiom
//!
//! A single market order whose protective legs attach when the parent
//! fills. Units are sign-encoded (negative = short), prices are quoted to
//! five decimals, and the order carries a client correlation id.

use serde::Serialize;
use uuid::Uuid;

use crate::policy::Side;

use super::types::BracketIntent;

/// Complete on-fill bracket payload
#[derive(Debug, Clone, Serialize)]
pub struct OnFillOrder {
    pub order: OnFillBody,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OnFillBody {
    pub instrument: String,
    /// Sign-encoded unit count, negative for shorts
    pub units: String,
    #[serde(rename = "type")]
    pub order_type: String,
    pub time_in_force: String,
    pub position_fill: String,
    pub take_profit_on_fill: PriceLeg,
    pub stop_loss_on_fill: PriceLeg,
    pub client_extensions: ClientExtensions,
}

#[derive(Debug, Clone, Serialize)]
pub struct PriceLeg {
    pub price: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ClientExtensions {
    pub id: String,
}

/// Shape an intent into the on-fill idiom
pub fn shape_on_fill(intent: &BracketIntent) -> OnFillOrder {
    let prices = intent.resolve_levels();
    let units = match intent.side {
        Side::Long => intent.size,
        Side::Short => -intent.size,
    };

    OnFillOrder {
        order: OnFillBody {
            instrument: intent.instrument.clone(),
            units: units.to_string(),
            order_type: "MARKET".to_string(),
            time_in_force: "FOK".to_string(),
            position_fill: "DEFAULT".to_string(),
            take_profit_on_fill: PriceLeg {
                price: format!("{:.5}", prices.take_profit),
            },
            stop_loss_on_fill: PriceLeg {
                price: format!("{:.5}", prices.stop_loss),
            },
            client_extensions: ClientExtensions {
                id: Uuid::new_v4().to_string(),
            },
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bracket::types::BracketLevels;
    use rust_decimal_macros::dec;

    fn buy_intent() -> BracketIntent {
        BracketIntent {
            side: Side::Long,
            instrument: "EUR_USD".to_string(),
            entry_price: dec!(1.2754),
            size: dec!(10000),
            levels: BracketLevels::Distances {
                tp_pips: dec!(28),
                sl_pips: dec!(15),
                pip: dec!(0.0001),
            },
        }
    }

    #[test]
    fn test_buy_order_shape() {
        let order = shape_on_fill(&buy_intent());
        assert_eq!(order.order.instrument, "EUR_USD");
        assert_eq!(order.order.units, "10000");
        assert_eq!(order.order.order_type, "MARKET");
        assert_eq!(order.order.take_profit_on_fill.price, "1.27820");
        assert_eq!(order.order.stop_loss_on_fill.price, "1.27390");
    }

    #[test]
    fn test_sell_units_are_negative() {
        let intent = BracketIntent {
            side: Side::Short,
            ..buy_intent()
        };
        let order = shape_on_fill(&intent);
        assert_eq!(order.order.units, "-10000");
        // Mirrored levels: TP below entry, SL above
        assert_eq!(order.order.take_profit_on_fill.price, "1.27260");
        assert_eq!(order.order.stop_loss_on_fill.price, "1.27690");
    }

    #[test]
    fn test_wire_field_names() {
        let order = shape_on_fill(&buy_intent());
        let json = serde_json::to_value(&order).unwrap();
        let body = &json["order"];
        assert_eq!(body["type"], "MARKET");
        assert_eq!(body["timeInForce"], "FOK");
        assert_eq!(body["positionFill"], "DEFAULT");
        assert!(body["takeProfitOnFill"]["price"].is_string());
        assert!(body["stopLossOnFill"]["price"].is_string());
        assert!(body["clientExtensions"]["id"].is_string());
    }

    #[test]
    fn test_correlation_ids_are_unique_per_shape() {
        let a = shape_on_fill(&buy_intent());
        let b = shape_on_fill(&buy_intent());
        assert_ne!(
            a.order.client_extensions.id,
            b.order.client_extensions.id
        );
    }
}
