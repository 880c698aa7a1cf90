use vigil_cache::SafeCache;

use std::sync::Arc;
use std::thread;

#[derive(Debug)]
enum TransferError {
  InsufficientFunds { account: &'static str, balance: i64 },
}

fn transfer(
  accounts: &SafeCache<&'static str, i64>,
  from: &'static str,
  to: &'static str,
  amount: i64,
) -> Result<(), TransferError> {
  accounts.with_lock(|session| {
    let balance = session.get(from).copied().unwrap_or(0);
    if balance < amount {
      return Err(TransferError::InsufficientFunds {
        account: from,
        balance,
      });
    }
    session.insert(from, balance - amount);
    *session.get_mut(to).expect("destination account exists") += amount;
    Ok(())
  })
}

fn main() {
  let accounts = Arc::new(SafeCache::new(16));
  accounts.insert("alice", 100);
  accounts.insert("bob", 0);

  let handles: Vec<_> = (0..4)
    .map(|_| {
      let accounts = accounts.clone();
      thread::spawn(move || {
        for _ in 0..30 {
          if let Err(err) = transfer(&accounts, "alice", "bob", 1) {
            println!("Transfer rejected: {:?}", err);
            break;
          }
        }
      })
    })
    .collect();

  for handle in handles {
    handle.join().unwrap();
  }

  // Every transfer was applied as one unit, so no money was created or lost.
  let alice = accounts.get("alice").unwrap();
  let bob = accounts.get("bob").unwrap();
  println!("alice = {}, bob = {}, total = {}", alice, bob, alice + bob);
  assert_eq!(alice + bob, 100);

  accounts.reset();
  println!("After reset: {} accounts, capacity hint {}", accounts.len(), accounts.capacity());
}
