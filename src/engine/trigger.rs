use crate::models::{Direction, StopOrder, Tick};

/// A pending order that satisfied its trigger condition on a tick,
/// paired with the price its venue order will be submitted at.
#[derive(Debug, Clone, PartialEq)]
pub struct TriggerCandidate {
    pub order_id: u64,
    pub fill_price: f64,
}

/// Collect every pending order on the tick's symbol whose trigger
/// condition the tick satisfies.
///
/// The whole candidate set is built before any order is applied, so the
/// iteration order of `pending` cannot affect the result. A long order
/// triggers at `last_price >= trigger_price`, a short order at
/// `last_price <= trigger_price`. Long triggers fill at the tick's upper
/// price limit and short triggers at its lower limit, modelling an
/// aggressive market order against the venue's daily price band; the
/// live and replay paths share this exact convention.
pub fn evaluate(tick: &Tick, pending: &[&StopOrder]) -> Vec<TriggerCandidate> {
    pending
        .iter()
        .filter(|order| order.symbol == tick.symbol)
        .filter_map(|order| {
            let (triggered, fill_price) = match order.direction {
                Direction::Long => (tick.last_price >= order.trigger_price, tick.upper_limit),
                Direction::Short => (tick.last_price <= order.trigger_price, tick.lower_limit),
            };

            triggered.then(|| TriggerCandidate {
                order_id: order.id,
                fill_price,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Offset, StopOrderStatus};
    use chrono::Utc;

    fn create_test_order(id: u64, direction: Direction, trigger_price: f64) -> StopOrder {
        StopOrder {
            id,
            symbol: "rb2410".to_string(),
            direction,
            offset: Offset::Open,
            trigger_price,
            volume: 1.0,
            status: StopOrderStatus::Pending,
            sequence: id,
        }
    }

    fn create_test_tick(last_price: f64) -> Tick {
        Tick {
            symbol: "rb2410".to_string(),
            last_price,
            upper_limit: last_price * 1.1,
            lower_limit: last_price * 0.9,
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn test_long_triggers_at_or_above_trigger_price() {
        let below = create_test_order(1, Direction::Long, 3650.0);
        let at = create_test_order(2, Direction::Long, 3600.0);
        let above = create_test_order(3, Direction::Long, 3550.0);
        let pending = vec![&below, &at, &above];

        let candidates = evaluate(&create_test_tick(3600.0), &pending);

        let ids: Vec<u64> = candidates.iter().map(|c| c.order_id).collect();
        assert_eq!(ids, vec![2, 3]);
    }

    #[test]
    fn test_short_triggers_at_or_below_trigger_price() {
        let above = create_test_order(1, Direction::Short, 3550.0);
        let at = create_test_order(2, Direction::Short, 3600.0);
        let below = create_test_order(3, Direction::Short, 3650.0);
        let pending = vec![&above, &at, &below];

        let candidates = evaluate(&create_test_tick(3600.0), &pending);

        let ids: Vec<u64> = candidates.iter().map(|c| c.order_id).collect();
        assert_eq!(ids, vec![2, 3]);
    }

    #[test]
    fn test_fill_price_uses_limit_band() {
        let long = create_test_order(1, Direction::Long, 3600.0);
        let short = create_test_order(2, Direction::Short, 3600.0);
        let pending = vec![&long, &short];

        let tick = Tick {
            symbol: "rb2410".to_string(),
            last_price: 3600.0,
            upper_limit: 3960.0,
            lower_limit: 3240.0,
            timestamp: Utc::now(),
        };

        let candidates = evaluate(&tick, &pending);
        assert_eq!(candidates.len(), 2);
        assert_eq!(candidates[0].fill_price, 3960.0);
        assert_eq!(candidates[1].fill_price, 3240.0);
    }

    #[test]
    fn test_result_independent_of_pending_order() {
        let a = create_test_order(1, Direction::Long, 3590.0);
        let b = create_test_order(2, Direction::Short, 3610.0);
        let c = create_test_order(3, Direction::Long, 3700.0);

        let tick = create_test_tick(3600.0);

        let forward = evaluate(&tick, &vec![&a, &b, &c]);
        let backward = evaluate(&tick, &vec![&c, &b, &a]);

        let mut forward_ids: Vec<u64> = forward.iter().map(|c| c.order_id).collect();
        let mut backward_ids: Vec<u64> = backward.iter().map(|c| c.order_id).collect();
        forward_ids.sort_unstable();
        backward_ids.sort_unstable();

        assert_eq!(forward_ids, backward_ids);
        assert_eq!(forward_ids, vec![1, 2]);
    }
}
