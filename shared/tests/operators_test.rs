extern crate shared;
use shared::operators::*;
use shared::table::*;

#[cfg(test)]
mod tests {
    use super::*;

    fn setup_database() -> Database {
        let facts = "r,Flight,from,to\n\
                     t,BRU,AMS\n\
                     t,AMS,CDG\n\
                     t,CDG,BRU\n\
                     t,AMS,BRU\n\
                     r,Hub,to\n\
                     t,AMS\n\
                     t,CDG\n";
        Database::load_from_str(facts).unwrap()
    }

    fn rows(table: &Table) -> Vec<String> {
        let mut rows: Vec<String> = table.tuples().iter().map(|t| t.join(",")).collect();
        rows.sort();
        rows
    }

    #[test]
    fn test_semijoin_then_project() {
        let db = setup_database();
        let mut flights = db.table("Flight").unwrap().clone();
        let hubs = db.table("Hub").unwrap();

        assert!(semijoin(&mut flights, hubs));
        assert_eq!(rows(&flights), vec!["AMS,CDG", "BRU,AMS"]);
        // statistics still describe the loaded relation
        assert_eq!(flights.stats().unwrap().size(), 4);

        let origins = project(&flights, "from").unwrap();
        assert_eq!(rows(&origins), vec!["AMS", "BRU"]);
    }

    #[test]
    fn test_two_hop_join_and_distinct() {
        let db = setup_database();
        let first = db.table("Flight").unwrap();
        let mut second = Table::new(&["to", "via"], false).unwrap();
        second.add_tuples(first.tuples().iter().cloned()).unwrap();

        let hops = join(first, &second);
        assert_eq!(hops.attributes(), &["from", "to", "via"]);
        assert_eq!(hops.size(), 5);

        let origins = distinct(&hops, &["from"]).unwrap();
        assert_eq!(rows(&origins), vec!["AMS", "BRU", "CDG"]);
    }

    #[test]
    fn test_select_with_cycle_condition() {
        let db = setup_database();
        let mut flights = db.table("Flight").unwrap().clone();
        assert!(select(&mut flights, |t| t[0] < t[1]));
        assert_eq!(rows(&flights), vec!["AMS,BRU", "AMS,CDG"]);
    }
}
