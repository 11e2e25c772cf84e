use crate::model::Transaction;

/// Trimmed, lowercased form of a search query.
pub fn normalize_query(query: &str) -> String {
    query.trim().to_lowercase()
}

/// Case-insensitive substring match on `product` or `id`.
pub fn matches(tx: &Transaction, normalized: &str) -> bool {
    normalized.is_empty()
        || tx.product.to_lowercase().contains(normalized)
        || tx.id.to_lowercase().contains(normalized)
}

/// Pure projection of `transactions` through `query`. An empty query keeps
/// every entry in its original order.
pub fn filter<'a, I>(transactions: I, query: &str) -> Vec<Transaction>
where
    I: IntoIterator<Item = &'a Transaction>,
{
    let q = normalize_query(query);
    transactions
        .into_iter()
        .filter(|tx| matches(tx, &q))
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tx(id: &str, product: &str) -> Transaction {
        Transaction {
            id: id.to_string(),
            product: product.to_string(),
            date: "2024-01-01T10:00:00Z".to_string(),
            amount: 1.0,
        }
    }

    #[test]
    fn test_empty_query_is_identity() {
        let txs = vec![tx("txn_1", "RAM DDR4"), tx("txn_2", "SSD 1TB"), tx("txn_3", "Mouse Pro")];
        assert_eq!(filter(&txs, ""), txs);
        assert_eq!(filter(&txs, "   "), txs);
    }

    #[test]
    fn test_case_insensitive_product_match() {
        let txs = vec![tx("txn_1", "Mouse Pro")];
        assert_eq!(filter(&txs, "mouse"), txs);
        assert_eq!(filter(&txs, "  MOUSE  "), txs);
    }

    #[test]
    fn test_matches_id_substring() {
        let txs = vec![tx("txn_101", "RAM DDR4"), tx("txn_202", "SSD 1TB")];
        let out = filter(&txs, "TXN_1");
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].id, "txn_101");
    }

    #[test]
    fn test_absent_fields_never_match_nonempty_query() {
        let txs = vec![tx("", "")];
        assert!(filter(&txs, "x").is_empty());
        assert_eq!(filter(&txs, "").len(), 1);
    }

    #[test]
    fn test_preserves_relative_order() {
        let txs = vec![tx("a1", "SSD 1TB"), tx("b2", "RAM"), tx("c3", "SSD 2TB")];
        let ids: Vec<String> = filter(&txs, "ssd").into_iter().map(|t| t.id).collect();
        assert_eq!(ids, vec!["a1", "c3"]);
    }
}
