use envelope_model::{Arena, Instant, Levels, Role, Transaction};

/// Fills the instantaneous and cumulative aggregates of `levels`.
///
/// Instantaneous maxima sum the largest quantity of every transaction that
/// may happen at the instant; minima only count transactions fixed there.
/// Cumulative maxima grow as transactions become possible and minima as
/// they become certain, so each transaction is counted once in each sum.
pub fn tally(prev: &Levels, instant: &Instant, transactions: &Arena<Transaction>, levels: &mut Levels) {
    levels.min_instant_production = 0.0;
    levels.max_instant_production = 0.0;
    levels.min_instant_consumption = 0.0;
    levels.max_instant_consumption = 0.0;
    levels.min_cumulative_production = prev.min_cumulative_production;
    levels.max_cumulative_production = prev.max_cumulative_production;
    levels.min_cumulative_consumption = prev.min_cumulative_consumption;
    levels.max_cumulative_consumption = prev.max_cumulative_consumption;

    for &id in instant.transactions() {
        let transaction = &transactions[id];
        let quantity = transaction.quantity();
        let fixed = transaction.is_time_singleton();
        let starts = instant.starting().contains(&id);
        let ends = instant.ending().contains(&id);
        match transaction.role() {
            Role::Producer => {
                levels.max_instant_production += quantity.ub;
                if fixed {
                    levels.min_instant_production += quantity.lb;
                }
                if starts {
                    levels.max_cumulative_production += quantity.ub;
                }
                if ends {
                    levels.min_cumulative_production += quantity.lb;
                }
            }
            Role::Consumer => {
                levels.max_instant_consumption += quantity.ub;
                if fixed {
                    levels.min_instant_consumption += quantity.lb;
                }
                if starts {
                    levels.max_cumulative_consumption += quantity.ub;
                }
                if ends {
                    levels.min_cumulative_consumption += quantity.lb;
                }
            }
        }
    }
}
