//! Bitbreite eines Event-Code-Teils (EXI 6.2).

/// `⌈log₂(n)⌉`: Bits, um zwischen `n` Geschwistern eines Tupels zu waehlen.
/// Ein einzelnes Kind (oder keins) braucht kein Bit.
#[inline]
pub fn for_count(n: usize) -> u8 {
    match n {
        0 | 1 => 0,
        _ => (usize::BITS - (n - 1).leading_zeros()) as u8,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn breiten() {
        let cases = [(0, 0), (1, 0), (2, 1), (3, 2), (4, 2), (5, 3), (8, 3), (9, 4), (257, 9)];
        for (n, bits) in cases {
            assert_eq!(for_count(n), bits, "n = {n}");
        }
    }
}
