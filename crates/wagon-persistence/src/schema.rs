// Esquema Diesel de las cuatro tablas del inventario. Los nombres de columna
// en camelCase son los del esquema SQLite del terminal.
diesel::table! {
    wagons (id) {
        id -> Integer,
        numero -> Text,
        #[sql_name = "createdAt"]
        created_at -> Timestamp,
    }
}
diesel::table! {
    zones (id) {
        id -> Integer,
        numero -> Integer,
        #[sql_name = "wagonId"]
        wagon_id -> Integer,
        #[sql_name = "createdAt"]
        created_at -> Timestamp,
    }
}
diesel::table! {
    sacs (id) {
        id -> Integer,
        identifiant -> Text,
        #[sql_name = "zoneId"]
        zone_id -> Integer,
        #[sql_name = "createdAt"]
        created_at -> Timestamp,
    }
}
diesel::table! {
    pieces (id) {
        id -> Integer,
        code -> Text,
        etat -> Integer,
        prioritaire -> Bool,
        #[sql_name = "positionIndex"]
        position_index -> Integer,
        #[sql_name = "sacId"]
        sac_id -> Integer,
        #[sql_name = "createdAt"]
        created_at -> Timestamp,
    }
}
diesel::joinable!(zones -> wagons (wagon_id));
diesel::joinable!(sacs -> zones (zone_id));
diesel::joinable!(pieces -> sacs (sac_id));
diesel::allow_tables_to_appear_in_same_query!(wagons, zones, sacs, pieces);
