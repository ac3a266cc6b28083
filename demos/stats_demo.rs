use clap::Parser;
use clap::ValueEnum;
use swiss_hash::HashMap;
use swiss_hash::HashSet;
use swiss_hash::IntMap;

#[derive(ValueEnum, Clone, Copy, Debug)]
enum Variant {
    Set,
    Map,
    Int,
}

#[derive(Parser, Debug)]
struct Args {
    #[arg(short = 'c', long = "target_capacity", default_value_t = 1000)]
    target_capacity: usize,

    #[arg(short = 'v', long = "variant", value_enum, default_value_t = Variant::Set)]
    variant: Variant,

    /// Fill to this fraction of the reported capacity.
    #[arg(short = 'f', long = "fill", default_value_t = 1.0)]
    fill: f64,
}

fn main() {
    let args = Args::parse();

    println!(
        "Creating {:?} with target capacity: {}",
        args.variant, args.target_capacity
    );

    match args.variant {
        Variant::Set => {
            let mut set: HashSet<String> = HashSet::with_capacity(args.target_capacity);
            let count = (set.capacity() as f64 * args.fill) as usize;
            println!("Actual capacity: {}", set.capacity());
            for i in 0..count {
                set.insert(format!("key_{i:08}"));
            }
            println!("Inserted {} keys", set.len());
            set.probe_histogram().print();
            set.debug_stats().print();
        }
        Variant::Map => {
            let mut map: HashMap<Vec<u8>, u64> = HashMap::with_capacity(args.target_capacity);
            let count = (map.capacity() as f64 * args.fill) as usize;
            println!("Actual capacity: {}", map.capacity());
            for i in 0..count as u64 {
                map.insert(i.to_le_bytes().to_vec(), i);
            }
            println!("Inserted {} entries", map.len());
            map.probe_histogram().print();
            map.debug_stats().print();
        }
        Variant::Int => {
            let mut map: IntMap<usize, usize> = IntMap::with_capacity(args.target_capacity);
            let count = (map.capacity() as f64 * args.fill) as usize;
            println!("Actual capacity: {}", map.capacity());
            // Pointer-like keys: 64-byte aligned addresses.
            for i in 0..count {
                map.insert(0x7f00_0000_0000 + i * 64, i);
            }
            println!("Inserted {} entries", map.len());
            map.probe_histogram().print();
            map.debug_stats().print();
        }
    }
}
