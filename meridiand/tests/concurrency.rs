//! Concurrency tests: racing executes, cancels and parallel users.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use meridian_domain::{OrderSide, OrderStatus, Symbol};
use meridian_ecosystem::{EcosystemGateway, StubAdvisory};
use meridian_engine::{Engine, EngineConfig, EngineError};
use meridian_store::MemoryStore;
use meridiand::TradingService;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

fn engine() -> Engine<MemoryStore> {
    Engine::new(MemoryStore::new(), EngineConfig::default())
}

#[test]
fn test_racing_executes_produce_one_trade() {
    let engine = engine();
    engine.create_user("u1", "Jane Doe", "jane@x.com").unwrap();
    let order = engine.place_order("u1", "GOLD", OrderSide::Buy, dec!(10), dec!(100)).unwrap();

    let wins = AtomicUsize::new(0);
    let conflicts = AtomicUsize::new(0);

    std::thread::scope(|s| {
        for _ in 0..8 {
            s.spawn(|| match engine.execute_trade(order.id, dec!(100)) {
                Ok(_) => {
                    wins.fetch_add(1, Ordering::SeqCst);
                },
                Err(EngineError::InvalidOrderState { .. }) => {
                    conflicts.fetch_add(1, Ordering::SeqCst);
                },
                Err(other) => panic!("unexpected error: {other}"),
            });
        }
    });

    assert_eq!(wins.load(Ordering::SeqCst), 1);
    assert_eq!(conflicts.load(Ordering::SeqCst), 7);

    let portfolio = engine.get_portfolio("u1").unwrap();
    assert_eq!(portfolio.cash_balance, dec!(-1000));
    assert_eq!(portfolio.trade_count, 1);
    assert_eq!(engine.get_trade_history("u1").unwrap().len(), 1);
}

#[test]
fn test_execute_races_cancel() {
    let engine = engine();
    engine.create_user("u1", "Jane Doe", "jane@x.com").unwrap();

    for _ in 0..20 {
        let order = engine.place_order("u1", "GOLD", OrderSide::Buy, dec!(1), dec!(10)).unwrap();

        let (executed, cancelled) = std::thread::scope(|s| {
            let exec = s.spawn(|| engine.execute_trade(order.id, dec!(10)).is_ok());
            let cancel = s.spawn(|| matches!(engine.cancel_order(order.id), Ok(true)));
            (exec.join().unwrap(), cancel.join().unwrap())
        });

        // Exactly one side wins, and the final status agrees with it
        assert!(executed ^ cancelled);
        let status = engine.get_order(order.id).unwrap().status;
        if executed {
            assert_eq!(status, OrderStatus::Executed);
        } else {
            assert_eq!(status, OrderStatus::Cancelled);
        }
    }

    let trades = engine.get_trade_history("u1").unwrap();
    let portfolio = engine.get_portfolio("u1").unwrap();
    assert_eq!(portfolio.trade_count, trades.len() as u64);
    assert_eq!(portfolio.cash_balance, dec!(-10) * Decimal::from(trades.len()));
}

#[test]
fn test_concurrent_orders_on_one_portfolio() {
    let engine = engine();
    let gold = Symbol::parse("GOLD").unwrap();
    engine.create_user("u1", "Jane Doe", "jane@x.com").unwrap();

    let orders: Vec<_> = (1..=50)
        .map(|i| {
            engine
                .place_order("u1", "GOLD", OrderSide::Buy, dec!(1), Decimal::from(i))
                .unwrap()
        })
        .collect();

    std::thread::scope(|s| {
        for chunk in orders.chunks(10) {
            let engine = &engine;
            s.spawn(move || {
                for order in chunk {
                    engine.execute_trade(order.id, order.limit_price.as_decimal()).unwrap();
                }
            });
        }
    });

    // 1 + 2 + ... + 50 = 1275
    let portfolio = engine.get_portfolio("u1").unwrap();
    let position = portfolio.position(&gold).unwrap();
    assert_eq!(position.quantity, dec!(50));
    assert_eq!(portfolio.cash_balance, dec!(-1275));
    assert_eq!(portfolio.trade_count, 50);

    // Replaying the history in recorded order reproduces the live books
    assert!(portfolio.same_books(&engine.rebuild_portfolio("u1").unwrap()));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_parallel_users_are_isolated() {
    let gateway = EcosystemGateway::disabled(Arc::new(StubAdvisory::new()));
    let service = Arc::new(TradingService::new(engine(), Arc::new(gateway)));

    let mut handles = Vec::new();
    for n in 0..10 {
        let service = service.clone();
        handles.push(tokio::spawn(async move {
            let user_id = format!("user-{n}");
            let engine = service.engine();
            engine.create_user(&user_id, "Trader", &format!("{user_id}@x.com")).unwrap();

            for _ in 0..5 {
                let order = engine
                    .place_order(&user_id, "GOLD", OrderSide::Buy, dec!(2), dec!(50))
                    .unwrap();
                engine.execute_trade(order.id, dec!(50)).unwrap();
            }

            let risk = service.assess_risk(&user_id).await.unwrap();
            assert!(!risk.is_available());
            user_id
        }));
    }

    for handle in handles {
        let user_id = handle.await.unwrap();
        let portfolio = service.engine().get_portfolio(&user_id).unwrap();
        assert_eq!(portfolio.cash_balance, dec!(-500));
        assert_eq!(portfolio.trade_count, 5);
        assert_eq!(service.engine().get_order_history(&user_id).unwrap().len(), 5);
    }

    assert_eq!(service.engine().store().user_count(), 10);
}
