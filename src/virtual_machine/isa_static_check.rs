#[cfg(test)]
mod tests {
    use crate::virtual_machine::isa::Opcode;

    const FNV_OFFSET: u64 = 0xcbf29ce484222325;
    const FNV_PRIME: u64 = 0x100000001b3;
    const EXPECTED_ISA_HASH: u64 = 7106206568601105282;

    fn fnv1a64(mut h: u64, bytes: &[u8]) -> u64 {
        for b in bytes {
            h ^= *b as u64;
            h = h.wrapping_mul(FNV_PRIME);
        }
        h
    }

    macro_rules! hash_isa {
        (
            $( $(#[$doc:meta])* $name:ident, $mnemonic:literal => [ $( $field:ident : $kind:ident ),* $(,)? ] ),* $(,)?
        ) => {{
            let mut h = FNV_OFFSET;
            $(
                let position = Opcode::ALL.iter().position(|op| *op == Opcode::$name).unwrap();
                h = fnv1a64(h, stringify!($name).as_bytes());
                h = fnv1a64(h, &[position as u8]);
                h = fnv1a64(h, $mnemonic.as_bytes());
                $(
                    h = fnv1a64(h, stringify!($field).as_bytes());
                    h = fnv1a64(h, stringify!($kind).as_bytes());
                )*
            )*
            h
        }};
    }

    fn current_isa_hash() -> u64 {
        crate::for_each_instruction!(hash_isa)
    }

    #[test]
    #[ignore]
    fn print_isa_hash() {
        println!("ISA_HASH={}", current_isa_hash());
    }

    /// Programs built against this table depend on its opcode order and
    /// operand order; bump the constant deliberately when the ISA changes.
    #[test]
    fn isa_hash_unchanged() {
        assert_eq!(current_isa_hash(), EXPECTED_ISA_HASH);
    }
}
