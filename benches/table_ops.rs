use alloc::format;
use alloc::string::String;
use core::hash::Hash;
use core::hash::Hasher;
use core::hint::black_box;

use criterion::AxisScale;
use criterion::BatchSize;
use criterion::Criterion;
use criterion::PlotConfiguration;
use criterion::Throughput;
use criterion::criterion_group;
use criterion::criterion_main;
use hashbrown::hash_table::Entry as HashbrownEntry;
use hashbrown::hash_table::HashTable as HashbrownHashTable;
use rand::Rng;
use rand::SeedableRng;
use rand::TryRngCore;
use rand::rngs::OsRng;
use rand::rngs::SmallRng;
use rand::seq::SliceRandom;
use rand_distr::Zipf;
use siphasher::sip::SipHasher;
use swiss_hash::HashTable as SwissHashTable;
use swiss_hash::hash_table::Entry as SwissEntry;

extern crate alloc;

trait KeyValuePair: Clone {
    fn new(key: u64) -> Self;

    fn hash_key(&self) -> u64;
    fn eq_key(&self, other: &Self) -> bool;
}

#[derive(Clone)]
struct TestItem {
    key: String,
    _value: u64,
}

impl KeyValuePair for TestItem {
    fn new(key: u64) -> Self {
        black_box(Self {
            key: format!("key_{:016X}", key),
            _value: key,
        })
    }

    fn hash_key(&self) -> u64 {
        let mut hasher = SipHasher::new();
        self.key.hash(&mut hasher);
        hasher.finish()
    }

    fn eq_key(&self, other: &Self) -> bool {
        self.key == other.key
    }
}

#[derive(Clone)]
struct SmallTestItem {
    key: u64,
}

impl KeyValuePair for SmallTestItem {
    fn new(key: u64) -> Self {
        black_box(Self { key })
    }

    fn hash_key(&self) -> u64 {
        let mut hasher = SipHasher::new();
        self.key.hash(&mut hasher);
        hasher.finish()
    }

    fn eq_key(&self, other: &Self) -> bool {
        self.key == other.key
    }
}

const SIZES: &[usize] = &[
    (1 << 10),
    (1 << 12),
    (1 << 14),
    (1 << 16),
    (1 << 18),
];

fn random_items<TestItem: KeyValuePair>(count: usize) -> Vec<(u64, TestItem)> {
    let mut rng = OsRng;
    (0..count)
        .map(|_| {
            let item = TestItem::new(rng.try_next_u64().unwrap());
            (item.hash_key(), item)
        })
        .collect()
}

fn fill_swiss<TestItem: KeyValuePair>(items: &[(u64, TestItem)]) -> SwissHashTable<TestItem> {
    let mut table = SwissHashTable::<TestItem>::with_capacity(0);
    for (hash, item) in items.iter().cloned() {
        match table.entry(hash, |v| v.eq_key(&item), |v| v.hash_key()) {
            SwissEntry::Vacant(entry) => {
                entry.insert(item);
            }
            SwissEntry::Occupied(_) => unreachable!(),
        }
    }
    table
}

fn fill_hashbrown<TestItem: KeyValuePair>(
    items: &[(u64, TestItem)],
) -> HashbrownHashTable<TestItem> {
    let mut table = HashbrownHashTable::<TestItem>::with_capacity(0);
    for (hash, item) in items.iter().cloned() {
        match table.entry(hash, |v| v.eq_key(&item), |v| v.hash_key()) {
            HashbrownEntry::Vacant(entry) => {
                entry.insert(item);
            }
            HashbrownEntry::Occupied(_) => unreachable!(),
        }
    }
    table
}

fn bench_insert_random<TestItem: KeyValuePair, const MAX_SIZE: usize>(c: &mut Criterion) {
    let mut group = c.benchmark_group(format!(
        "insert_random_{}",
        core::any::type_name::<TestItem>()
    ));
    group.plot_config(PlotConfiguration::default().summary_scale(AxisScale::Logarithmic));

    for size in SIZES[..=MAX_SIZE].iter() {
        let hash_and_item = random_items::<TestItem>(*size);

        group.throughput(Throughput::Elements(*size as u64));
        group.bench_function(format!("swiss_hash/{size}"), |b| {
            b.iter_batched(
                || {
                    let mut hash_and_item = hash_and_item.clone();
                    hash_and_item.shuffle(&mut SmallRng::from_os_rng());
                    hash_and_item
                },
                |hash_and_item| black_box(fill_swiss(&hash_and_item)),
                BatchSize::SmallInput,
            )
        });

        group.bench_function(format!("hashbrown/{size}"), |b| {
            b.iter_batched(
                || {
                    let mut hash_and_item = hash_and_item.clone();
                    hash_and_item.shuffle(&mut SmallRng::from_os_rng());
                    hash_and_item
                },
                |hash_and_item| black_box(fill_hashbrown(&hash_and_item)),
                BatchSize::SmallInput,
            )
        });
    }

    group.finish();
}

fn bench_insert_reserved<TestItem: KeyValuePair, const MAX_SIZE: usize>(c: &mut Criterion) {
    let mut group = c.benchmark_group(format!(
        "insert_reserved_{}",
        core::any::type_name::<TestItem>()
    ));
    group.plot_config(PlotConfiguration::default().summary_scale(AxisScale::Logarithmic));

    for size in SIZES[..=MAX_SIZE].iter() {
        let hash_and_item = random_items::<TestItem>(*size);

        group.throughput(Throughput::Elements(*size as u64));
        group.bench_function(format!("swiss_hash/{size}"), |b| {
            b.iter_batched(
                || hash_and_item.clone(),
                |hash_and_item| {
                    let mut table = SwissHashTable::<TestItem>::with_capacity(0);
                    table.reserve(hash_and_item.len(), |v| v.hash_key());
                    for (hash, item) in hash_and_item {
                        table
                            .entry(hash, |v| v.eq_key(&item), |v| v.hash_key())
                            .or_insert(item);
                    }
                    black_box(table)
                },
                BatchSize::SmallInput,
            )
        });

        group.bench_function(format!("hashbrown/{size}"), |b| {
            b.iter_batched(
                || hash_and_item.clone(),
                |hash_and_item| {
                    let mut table = HashbrownHashTable::<TestItem>::with_capacity(0);
                    table.reserve(hash_and_item.len(), |v| v.hash_key());
                    for (hash, item) in hash_and_item {
                        table
                            .entry(hash, |v| v.eq_key(&item), |v| v.hash_key())
                            .or_insert(item);
                    }
                    black_box(table)
                },
                BatchSize::SmallInput,
            )
        });
    }

    group.finish();
}

fn bench_find_hit_miss<TestItem: KeyValuePair, const MAX_SIZE: usize>(c: &mut Criterion) {
    let mut group = c.benchmark_group(format!(
        "find_hit_miss_{}",
        core::any::type_name::<TestItem>()
    ));
    group.plot_config(PlotConfiguration::default().summary_scale(AxisScale::Logarithmic));

    for size in SIZES[..=MAX_SIZE].iter() {
        let hits = (0..*size as u64 * 2)
            .step_by(2)
            .map(|key| {
                let item = TestItem::new(key);
                (item.hash_key(), item)
            })
            .collect::<Vec<(u64, TestItem)>>();

        let mut probes = hits.clone();
        probes.extend((1..=*size as u64 * 2).step_by(2).map(|key| {
            let item = TestItem::new(key);
            (item.hash_key(), item)
        }));
        probes.shuffle(&mut SmallRng::from_os_rng());

        let swiss_table = fill_swiss(&hits);
        let hashbrown_table = fill_hashbrown(&hits);

        group.throughput(Throughput::Elements(probes.len() as u64));
        group.bench_function(format!("swiss_hash/{size}"), |b| {
            b.iter(|| {
                for (hash, key) in &probes {
                    black_box(swiss_table.find(*hash, |v| v.eq_key(key)));
                }
            })
        });

        group.bench_function(format!("hashbrown/{size}"), |b| {
            b.iter(|| {
                for (hash, key) in &probes {
                    black_box(hashbrown_table.find(*hash, |v| v.eq_key(key)));
                }
            })
        });
    }

    group.finish();
}

fn bench_iteration<TestItem: KeyValuePair, const MAX_SIZE: usize>(c: &mut Criterion) {
    let mut group = c.benchmark_group(format!(
        "iteration_{}",
        core::any::type_name::<TestItem>()
    ));
    group.plot_config(PlotConfiguration::default().summary_scale(AxisScale::Logarithmic));

    for size in SIZES[..=MAX_SIZE].iter() {
        let hash_and_item = random_items::<TestItem>(*size);
        let swiss_table = fill_swiss(&hash_and_item);
        let hashbrown_table = fill_hashbrown(&hash_and_item);

        group.throughput(Throughput::Elements(*size as u64));
        group.bench_function(format!("swiss_hash/{size}"), |b| {
            b.iter(|| {
                for item in swiss_table.iter() {
                    black_box(item);
                }
            })
        });

        group.bench_function(format!("hashbrown/{size}"), |b| {
            b.iter(|| {
                for item in hashbrown_table.iter() {
                    black_box(item);
                }
            })
        });
    }

    group.finish();
}

#[derive(Clone, Copy)]
enum Operation {
    Find,
    Insert,
}

fn bench_mixed_zipf<TestItem: KeyValuePair, const MAX_SIZE: usize>(c: &mut Criterion) {
    for exponent in [1.0, 1.3] {
        let mut group = c.benchmark_group(format!(
            "mixed_zipf_{:.01}_{}",
            exponent,
            core::any::type_name::<TestItem>()
        ));
        group.plot_config(PlotConfiguration::default().summary_scale(AxisScale::Logarithmic));

        const KEY_SPACE_MULTIPLIER: u64 = 2;

        for size in SIZES[..=MAX_SIZE].iter() {
            let mut rng = SmallRng::from_os_rng();
            let op_distr = Zipf::new(2.0, exponent).unwrap();
            let key_distr = Zipf::new(*size as f64 * KEY_SPACE_MULTIPLIER as f64, 1.0).unwrap();

            // Lookups dominate; inserts of already present keys are no-ops.
            let operations = (0..*size * 3)
                .map(|_| {
                    let op_choice: f64 = rng.sample(op_distr);
                    let key = rng.sample(key_distr) as u64;
                    let item = TestItem::new(key);
                    let op = if op_choice <= 1.0 {
                        Operation::Find
                    } else {
                        Operation::Insert
                    };
                    (op, item.hash_key(), item)
                })
                .collect::<Vec<_>>();

            group.throughput(Throughput::Elements(operations.len() as u64));
            group.bench_function(format!("swiss_hash/{size}"), |b| {
                b.iter_batched(
                    || operations.clone(),
                    |operations| {
                        let mut table = SwissHashTable::<TestItem>::with_capacity(0);
                        for (op, hash, item) in operations {
                            match op {
                                Operation::Find => {
                                    black_box(table.find(hash, |v| v.eq_key(&item)));
                                }
                                Operation::Insert => {
                                    black_box(
                                        table
                                            .entry(hash, |v| v.eq_key(&item), |v| v.hash_key())
                                            .or_insert(item),
                                    );
                                }
                            }
                        }
                        black_box(table)
                    },
                    BatchSize::SmallInput,
                )
            });

            group.bench_function(format!("hashbrown/{size}"), |b| {
                b.iter_batched(
                    || operations.clone(),
                    |operations| {
                        let mut table = HashbrownHashTable::<TestItem>::with_capacity(0);
                        for (op, hash, item) in operations {
                            match op {
                                Operation::Find => {
                                    black_box(table.find(hash, |v| v.eq_key(&item)));
                                }
                                Operation::Insert => {
                                    black_box(
                                        table
                                            .entry(hash, |v| v.eq_key(&item), |v| v.hash_key())
                                            .or_insert(item),
                                    );
                                }
                            }
                        }
                        black_box(table)
                    },
                    BatchSize::SmallInput,
                )
            });
        }

        group.finish();
    }
}

fn bench_int_map(c: &mut Criterion) {
    let mut group = c.benchmark_group("int_map_pointer_keys");
    group.plot_config(PlotConfiguration::default().summary_scale(AxisScale::Logarithmic));

    for size in SIZES.iter() {
        let keys: Vec<usize> = (0..*size).map(|i| 0x7f00_0000_0000 + i * 64).collect();

        group.throughput(Throughput::Elements(*size as u64));
        group.bench_function(format!("swiss_hash/{size}"), |b| {
            b.iter(|| {
                let mut map: swiss_hash::IntMap<usize, usize> = swiss_hash::IntMap::new();
                for (i, &key) in keys.iter().enumerate() {
                    map.insert(key, i);
                }
                for &key in &keys {
                    black_box(map.get(key));
                }
                black_box(map)
            })
        });

        group.bench_function(format!("hashbrown/{size}"), |b| {
            b.iter(|| {
                let mut map: hashbrown::HashMap<usize, usize> = hashbrown::HashMap::new();
                for (i, &key) in keys.iter().enumerate() {
                    map.entry(key).or_insert(i);
                }
                for key in &keys {
                    black_box(map.get(key));
                }
                black_box(map)
            })
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_insert_random::<SmallTestItem, 4>,
    bench_insert_random::<TestItem, 4>,
    bench_insert_reserved::<SmallTestItem, 4>,
    bench_insert_reserved::<TestItem, 4>,
    bench_find_hit_miss::<SmallTestItem, 4>,
    bench_find_hit_miss::<TestItem, 4>,
    bench_iteration::<SmallTestItem, 4>,
    bench_iteration::<TestItem, 4>,
    bench_mixed_zipf::<SmallTestItem, 4>,
    bench_mixed_zipf::<TestItem, 4>,
    bench_int_map,
);

criterion_main!(benches);
