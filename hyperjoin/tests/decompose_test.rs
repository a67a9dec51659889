extern crate hyperjoin;
use hyperjoin::evaluator::{NumNodes, StatisticsEval};
use hyperjoin::*;
use shared::table::Database;
use std::sync::Arc;

#[cfg(test)]
mod tests {
    use super::*;

    const HYPERGRAPHS: &[&str] = &[
        "R(x,y).",
        "R(x,y), S(y,z).",
        "R(x,y), S(y,z), T(z,x).",
        "A(a,b,c), B(b,c,d), C(c,d,e), D(d,e,a).",
        "E1(a,b), E2(b,c), E3(c,d), E4(d,a), E5(a,c).",
        "Star1(c,x), Star2(c,y), Star3(c,z), Star4(c,w).",
    ];

    #[test]
    fn test_every_result_is_a_valid_decomposition() {
        for text in HYPERGRAPHS {
            let hg = Hypergraph::parse(text).unwrap();
            let tree = decompose(&hg, &mut NumNodes).unwrap();
            assert!(tree.validate(&hg).is_ok(), "invalid decomposition for {}", text);
            assert!(tree.len() <= hg.edges().len());
        }
    }

    #[test]
    fn test_acyclic_queries_split_into_one_node_per_edge() {
        for text in [
            "R(x,y), S(y,z), T(z,w).",
            "Star1(c,x), Star2(c,y), Star3(c,z), Star4(c,w).",
            "R(a,b), S(b,c), T(b,d), U(d,e).",
        ] {
            let hg = Hypergraph::parse(text).unwrap();
            let tree = decompose(&hg, &mut NumNodes).unwrap();
            assert_eq!(tree.len(), hg.edges().len(), "{}", text);
            for (_, node) in tree.nodes() {
                assert_eq!(node.cover.len(), 1);
            }
        }
    }

    #[test]
    fn test_rule_output_stays_at_the_root() {
        let hg = Hypergraph::from_rule("ans(a,e) :- R(a,b), S(b,c), T(b,d), U(d,e).").unwrap();
        let tree = decompose(&hg, &mut NumNodes).unwrap();
        assert!(tree.covers_output(hg.output()));
        assert!(tree.validate(&hg).is_ok());
    }

    #[test]
    fn test_statistics_guided_decomposition_end_to_end() {
        let hg = Hypergraph::parse("R(x,y), S(y,z), T(z,w).").unwrap();
        let db = Database::load_from_str(
            "r,R,x,y\nt,a,1\nt,b,1\nt,c,2\n\
             r,S,y,z\nt,1,p\nt,2,q\nt,3,r\n\
             r,T,z,w\nt,p,u\nt,q,v\nt,q,w\n",
        )
        .unwrap();

        let config = Config::default();
        let mut evaluator = StatisticsEval::new(&db, &hg, &config).unwrap();
        let tree = decompose(&hg, &mut evaluator).unwrap();
        assert!(tree.validate(&hg).is_ok());
        assert!(evaluator.statistics().len() >= hg.edges().len());

        let mut found: Vec<String> = solve(&hg, &tree, Arc::new(db))
            .unwrap()
            .map(|s| s.to_string())
            .collect();
        found.sort();
        assert_eq!(
            found,
            vec![
                "w x y z -> u a 1 p",
                "w x y z -> u b 1 p",
                "w x y z -> v c 2 q",
                "w x y z -> w c 2 q",
            ]
        );
    }

    #[test]
    fn test_evaluator_selection() {
        let hg = Hypergraph::parse("R(x,y), S(y,z).").unwrap();
        let db = Database::load_from_str("r,R,x,y\nt,a,1\nr,S,y,z\nt,1,p\n").unwrap();
        let config = Config::default();

        for kind in EvaluatorKind::ALL {
            let mut evaluator = evaluator_for(kind, &hg, Some(&db), &config).unwrap();
            assert_eq!(evaluator.name(), kind.as_str());
            let tree = decompose(&hg, evaluator.as_mut()).unwrap();
            assert!(tree.validate(&hg).is_ok());
        }

        let fallback = evaluator_for(EvaluatorKind::Statistics, &hg, None, &config).unwrap();
        assert_eq!(fallback.name(), "num_nodes");
    }
}
