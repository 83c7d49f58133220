use std::collections::HashMap;

use bigdecimal::BigDecimal;
use uuid::Uuid;

use crate::db::{LedgerStore, UserDirectory};
use crate::errors::AppError;
use crate::models::{
    PageParams, Pagination, RankedUser, RankingPage, TransactionType, UserSummary,
};

/// Profit leaderboard across all users.
///
/// Realized profit per user is the sum of COMPLETED sells minus the sum of
/// COMPLETED buys. Every directory user is ranked, profit zero when they
/// have no transactions. This path never takes the per-user lock: it may be
/// stale by one in-flight mutation, but the ledger's atomic writes mean it
/// never sees a torn record.
pub async fn get_user_ranking(
    ledger: &dyn LedgerStore,
    directory: &dyn UserDirectory,
    page: &PageParams,
) -> Result<RankingPage, AppError> {
    let users = directory.list_users().await?;
    let records = ledger.fetch_completed_all().await?;

    let mut profits: HashMap<Uuid, BigDecimal> = HashMap::new();
    for record in &records {
        let entry = profits
            .entry(record.user_id)
            .or_insert_with(|| BigDecimal::from(0));
        *entry = match record.transaction_type {
            TransactionType::Sell => &*entry + &record.total_amount,
            TransactionType::Buy => &*entry - &record.total_amount,
        };
    }

    let ranked = rank_users(users, &profits);

    let total = ranked.len() as i64;
    let offset = page.offset() as usize;
    let limit = page.limit.max(1) as usize;
    let ranking = ranked
        .into_iter()
        .enumerate()
        .skip(offset)
        .take(limit)
        .map(|(index, (user, total_profit))| RankedUser {
            rank: index as i64 + 1,
            user_id: user.id,
            user_full_name: user.full_name,
            total_profit,
        })
        .collect();

    Ok(RankingPage {
        ranking,
        pagination: Pagination::new(page, total),
    })
}

/// Descending by profit; ties broken by user id ascending so pagination is
/// deterministic.
fn rank_users(
    users: Vec<UserSummary>,
    profits: &HashMap<Uuid, BigDecimal>,
) -> Vec<(UserSummary, BigDecimal)> {
    let mut ranked: Vec<(UserSummary, BigDecimal)> = users
        .into_iter()
        .map(|user| {
            let profit = profits
                .get(&user.id)
                .cloned()
                .unwrap_or_else(|| BigDecimal::from(0));
            (user, profit)
        })
        .collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.id.cmp(&b.0.id)));
    ranked
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(id: u128, name: &str) -> UserSummary {
        UserSummary {
            id: Uuid::from_u128(id),
            full_name: name.to_string(),
        }
    }

    #[test]
    fn sorts_by_profit_descending() {
        let users = vec![user(1, "A"), user(2, "B"), user(3, "C")];
        let mut profits = HashMap::new();
        profits.insert(Uuid::from_u128(1), BigDecimal::from(500));
        profits.insert(Uuid::from_u128(2), BigDecimal::from(-200));
        profits.insert(Uuid::from_u128(3), BigDecimal::from(120));

        let ranked = rank_users(users, &profits);
        let names: Vec<&str> = ranked.iter().map(|(u, _)| u.full_name.as_str()).collect();
        assert_eq!(names, ["A", "C", "B"]);
    }

    #[test]
    fn ties_break_by_user_id() {
        let users = vec![user(9, "Later"), user(2, "Earlier")];
        let profits = HashMap::new();

        let ranked = rank_users(users, &profits);
        assert_eq!(ranked[0].0.full_name, "Earlier");
        assert_eq!(ranked[0].1, BigDecimal::from(0));
    }

    #[tokio::test]
    async fn paginated_leaderboard_end_to_end() {
        use crate::db::memory::{MemoryLedgerStore, MemoryUserStore};
        use crate::models::{CreateTransaction, TransactionRecord, TransactionStatus};
        use chrono::Utc;

        let ledger = MemoryLedgerStore::new();
        let users = MemoryUserStore::new();

        let a = Uuid::from_u128(1);
        let b = Uuid::from_u128(2);
        users.add_user(a, "User A", BigDecimal::from(0));
        users.add_user(b, "User B", BigDecimal::from(0));

        // A realizes +500, B realizes -200
        for (user_id, transaction_type, amount) in [
            (a, TransactionType::Buy, 1_000),
            (a, TransactionType::Sell, 1_500),
            (b, TransactionType::Buy, 700),
            (b, TransactionType::Sell, 500),
        ] {
            let input = CreateTransaction {
                user_id,
                transaction_type,
                stock_code: "VNM".into(),
                stock_name: "Vinamilk".into(),
                quantity: 1,
                price_per_unit: BigDecimal::from(amount),
                notes: None,
                order_id: None,
            };
            let mut record =
                TransactionRecord::new(&input, BigDecimal::from(amount), BigDecimal::from(0));
            record.status = TransactionStatus::Completed;
            record.executed_at = Some(Utc::now());
            ledger.insert(&record).await.unwrap();
        }

        let page = PageParams { page: 1, limit: 10 };
        let result = get_user_ranking(&ledger, &users, &page).await.unwrap();

        assert_eq!(result.pagination.total, 2);
        assert_eq!(result.ranking.len(), 2);
        assert_eq!(result.ranking[0].rank, 1);
        assert_eq!(result.ranking[0].user_full_name, "User A");
        assert_eq!(result.ranking[0].total_profit, BigDecimal::from(500));
        assert_eq!(result.ranking[1].rank, 2);
        assert_eq!(result.ranking[1].total_profit, BigDecimal::from(-200));

        // Second page of a one-per-page view keeps global ranks
        let page2 = PageParams { page: 2, limit: 1 };
        let result2 = get_user_ranking(&ledger, &users, &page2).await.unwrap();
        assert_eq!(result2.ranking.len(), 1);
        assert_eq!(result2.ranking[0].rank, 2);
        assert_eq!(result2.pagination.total_pages, 2);
    }
}
