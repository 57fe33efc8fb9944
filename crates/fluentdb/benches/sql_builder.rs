use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use fluentdb::{
    Cursor, Database, DbConfig, DbError, DbResult, ParamType, RawConnection, RowValues, SqlQb,
};

struct NullConnection;

impl RawConnection for NullConnection {
    fn execute(&self, _sql: &str) -> DbResult<u64> {
        Ok(0)
    }

    fn query(&self, _sql: &str) -> DbResult<Box<dyn Cursor>> {
        Err(DbError::unsupported("query"))
    }

    fn quote(&self, _value: &str, _param_type: ParamType) -> Option<String> {
        None
    }

    fn last_insert_id(&self) -> DbResult<String> {
        Ok(String::new())
    }
}

fn database() -> Database {
    Database::new(NullConnection, DbConfig::default().with_native_quoting(false))
}

/// SELECT col0, col1, ... FROM t WHERE col0 = 0 AND col1 = 'v1' ...
fn bench_select(c: &mut Criterion) {
    let db = database();
    let mut group = c.benchmark_group("sql_builder/select");

    for n in [1, 5, 10, 50, 100] {
        group.bench_with_input(BenchmarkId::from_parameter(n), &n, |b, &n| {
            b.iter(|| {
                let mut qb = db.select().from("t");
                for i in 0..n {
                    qb = qb.column(format!("col{i}").as_str());
                    qb = if i % 2 == 0 {
                        qb.where_eq(format!("col{i}").as_str(), i as i64)
                    } else {
                        qb.where_eq(format!("col{i}").as_str(), format!("v{i}"))
                    };
                }
                black_box(qb.order("col0", "DESC").limit_offset(10, 20).build_query())
            });
        });
    }

    group.finish();
}

fn bench_insert_rows(c: &mut Criterion) {
    let db = database();
    let mut group = c.benchmark_group("sql_builder/insert_rows");

    for n in [1, 10, 100, 500] {
        let rows: Vec<RowValues> = (0..n)
            .map(|i| {
                RowValues::new()
                    .set("id", i as i64)
                    .set("name", format!("user'{i}"))
                    .set("note", "")
            })
            .collect();
        group.bench_with_input(BenchmarkId::from_parameter(n), &rows, |b, rows| {
            b.iter(|| {
                let qb = db.insert().into("users").values(rows.iter().cloned());
                black_box(qb.build_query())
            });
        });
    }

    group.finish();
}

fn bench_where_in(c: &mut Criterion) {
    let db = database();
    let mut group = c.benchmark_group("sql_builder/where_in");

    for n in [5, 20, 100, 500] {
        let values: Vec<i64> = (0..n).collect();
        group.bench_with_input(BenchmarkId::from_parameter(n), &values, |b, values| {
            b.iter(|| {
                let qb = db.select().from("t").where_eq("id", values.clone());
                black_box(qb.build_query())
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_select, bench_insert_rows, bench_where_in);
criterion_main!(benches);
