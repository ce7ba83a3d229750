use super::{resolve, FieldMappingTable, FlatFieldMap};
use crate::constants::ADDRESS_JOINER;
use crate::types::Field;

/// Assemble a postal address for one row.
///
/// A published full-address column is used verbatim. Only when it is missing or
/// empty are the street and house columns joined, skipping whichever is empty.
pub fn compose_address(map: &FlatFieldMap, table: &FieldMappingTable) -> String {
    let full = resolve(map, Field::Address, table);
    if !full.is_empty() {
        return full;
    }

    let street = resolve(map, Field::AddressStreet, table);
    let house = resolve(map, Field::AddressHouse, table);
    [street, house]
        .into_iter()
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(ADDRESS_JOINER)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn compose(pairs: &[(&str, &str)]) -> String {
        compose_address(&FlatFieldMap::from_pairs(pairs.iter().copied()), &FieldMappingTable::default())
    }

    #[test]
    fn test_full_address_wins_over_parts() {
        let address = compose(&[
            ("Адреса", "м. Львів, вул. Франка 1"),
            ("addressThoroughfare", "вул. Шевченка"),
            ("addressLocatorDesignator", "5"),
        ]);
        assert_eq!(address, "м. Львів, вул. Франка 1");
    }

    #[test]
    fn test_street_and_house_are_joined() {
        let address = compose(&[("address_thoroughfare", "вул. Шевченка"), ("Номер будинку", "5А")]);
        assert_eq!(address, "вул. Шевченка, 5А");
    }

    #[test]
    fn test_empty_full_address_falls_back_to_parts() {
        let address = compose(&[("Address", ""), ("Street", "просп. Миру")]);
        assert_eq!(address, "просп. Миру");
    }

    #[test]
    fn test_house_alone() {
        assert_eq!(compose(&[("House", "12")]), "12");
    }

    #[test]
    fn test_nothing_yields_empty() {
        assert_eq!(compose(&[("Назва", "ОСББ")]), "");
    }
}
