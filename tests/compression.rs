#![cfg(feature = "compression")]

use maxsat_ilp::{
    fio::dimacs::Parser,
    types::{Cost, WClause},
};

fn read(name: &str) -> Vec<WClause> {
    let manifest = std::env::var("CARGO_MANIFEST_DIR").unwrap();
    let parser = Parser::open(format!("{manifest}/data/{name}")).unwrap();
    assert_eq!(parser.header().n_vars, 10);
    assert_eq!(parser.header().top(), Some(1000));
    parser.collect::<Result<_, _>>().unwrap()
}

#[test]
fn small_instance_all_formats() {
    let plain = read("small.wcnf");
    assert_eq!(plain.len(), 30);
    assert_eq!(plain.iter().filter(|cl| cl.cost() == Cost::Hard).count(), 8);
    for ext in ["gz", "bz2", "xz"] {
        assert_eq!(read(&format!("small.wcnf.{ext}")), plain);
    }
}
