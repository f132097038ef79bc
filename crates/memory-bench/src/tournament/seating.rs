/// Which agent sits in each slot, one entry per permutation.
///
/// The first order seats agents as configured; the second swaps them so each
/// agent gets to open the game.
pub struct SeatOrders {
    orders: Vec<[usize; 2]>,
}

impl SeatOrders {
    pub fn new(count: usize) -> Self {
        let orders = (0..count.min(2)).map(|k| [k % 2, (k + 1) % 2]).collect();
        Self { orders }
    }

    pub fn as_slice(&self) -> &[[usize; 2]] {
        &self.orders
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_order_keeps_configured_seating() {
        let orders = SeatOrders::new(1);
        assert_eq!(orders.as_slice(), &[[0, 1]]);
    }

    #[test]
    fn caps_at_two_orders() {
        let orders = SeatOrders::new(7);
        assert_eq!(orders.as_slice(), &[[0, 1], [1, 0]]);
    }
}
