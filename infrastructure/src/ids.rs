use uuid::Uuid;

/// Identifiers for every resource created by one provisioning run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResourceIds {
    pub data_source_id: String,
    pub data_set_id: String,
    pub physical_table_id: String,
    pub logical_table_id: String,
    pub analysis_id: String,
    pub sheet_id: String,
}

impl ResourceIds {
    pub fn generate() -> Self {
        Self {
            data_source_id: new_id(),
            data_set_id: new_id(),
            physical_table_id: new_id(),
            logical_table_id: new_id(),
            analysis_id: new_id(),
            sheet_id: new_id(),
        }
    }
}

fn new_id() -> String {
    Uuid::new_v4().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_generate_distinct_ids() {
        let ids = ResourceIds::generate();

        let unique: HashSet<&String> = [
            &ids.data_source_id,
            &ids.data_set_id,
            &ids.physical_table_id,
            &ids.logical_table_id,
            &ids.analysis_id,
            &ids.sheet_id,
        ]
        .into_iter()
        .collect();

        assert_eq!(unique.len(), 6);
        assert!(Uuid::parse_str(&ids.data_source_id).is_ok());
    }
}
