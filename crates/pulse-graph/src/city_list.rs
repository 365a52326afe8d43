//! Built-in world cities, latitude and longitude in degrees.

use crate::coords::GeoCoord;

const fn c(latitude_deg: f32, longitude_deg: f32) -> GeoCoord {
    GeoCoord::new(latitude_deg, longitude_deg)
}

static WORLD_CITIES: &[GeoCoord] = &[
    // Europe
    c(51.51, -0.13),   // London
    c(48.86, 2.35),    // Paris
    c(52.52, 13.40),   // Berlin
    c(40.42, -3.70),   // Madrid
    c(41.90, 12.50),   // Rome
    c(52.37, 4.90),    // Amsterdam
    c(50.85, 4.35),    // Brussels
    c(48.21, 16.37),   // Vienna
    c(50.08, 14.44),   // Prague
    c(52.23, 21.01),   // Warsaw
    c(47.50, 19.04),   // Budapest
    c(59.33, 18.07),   // Stockholm
    c(59.91, 10.75),   // Oslo
    c(55.68, 12.57),   // Copenhagen
    c(60.17, 24.94),   // Helsinki
    c(53.35, -6.26),   // Dublin
    c(38.72, -9.14),   // Lisbon
    c(41.39, 2.17),    // Barcelona
    c(45.46, 9.19),    // Milan
    c(47.38, 8.54),    // Zurich
    c(37.98, 23.73),   // Athens
    c(44.43, 26.10),   // Bucharest
    c(42.70, 23.32),   // Sofia
    c(44.79, 20.45),   // Belgrade
    c(55.76, 37.62),   // Moscow
    c(59.94, 30.31),   // Saint Petersburg
    c(50.45, 30.52),   // Kyiv
    c(41.01, 28.98),   // Istanbul
    c(53.48, -2.24),   // Manchester
    c(55.95, -3.19),   // Edinburgh
    c(43.30, 5.37),    // Marseille
    c(53.55, 9.99),    // Hamburg
    c(48.14, 11.58),   // Munich
    // Africa
    c(30.04, 31.24),   // Cairo
    c(6.52, 3.38),     // Lagos
    c(-1.29, 36.82),   // Nairobi
    c(-26.20, 28.05),  // Johannesburg
    c(-33.92, 18.42),  // Cape Town
    c(33.57, -7.59),   // Casablanca
    c(36.81, 10.18),   // Tunis
    c(36.75, 3.06),    // Algiers
    c(9.03, 38.74),    // Addis Ababa
    c(5.60, -0.19),    // Accra
    c(14.72, -17.47),  // Dakar
    c(-4.44, 15.27),   // Kinshasa
    c(-6.79, 39.21),   // Dar es Salaam
    c(-8.84, 13.23),   // Luanda
    c(15.50, 32.56),   // Khartoum
    c(-18.88, 47.51),  // Antananarivo
    // Middle East and Central Asia
    c(25.20, 55.27),   // Dubai
    c(24.71, 46.68),   // Riyadh
    c(35.69, 51.39),   // Tehran
    c(33.31, 44.36),   // Baghdad
    c(31.77, 35.21),   // Jerusalem
    c(33.89, 35.50),   // Beirut
    c(31.95, 35.93),   // Amman
    c(25.29, 51.53),   // Doha
    c(41.30, 69.24),   // Tashkent
    c(43.24, 76.89),   // Almaty
    c(34.56, 69.21),   // Kabul
    // South Asia
    c(28.61, 77.21),   // Delhi
    c(19.08, 72.88),   // Mumbai
    c(12.97, 77.59),   // Bangalore
    c(13.08, 80.27),   // Chennai
    c(22.57, 88.36),   // Kolkata
    c(24.86, 67.01),   // Karachi
    c(31.55, 74.34),   // Lahore
    c(23.81, 90.41),   // Dhaka
    c(27.72, 85.32),   // Kathmandu
    c(6.93, 79.85),    // Colombo
    // East and Southeast Asia
    c(39.90, 116.41),  // Beijing
    c(31.23, 121.47),  // Shanghai
    c(22.32, 114.17),  // Hong Kong
    c(23.13, 113.26),  // Guangzhou
    c(30.57, 104.07),  // Chengdu
    c(34.34, 108.94),  // Xi'an
    c(35.68, 139.69),  // Tokyo
    c(34.69, 135.50),  // Osaka
    c(43.06, 141.35),  // Sapporo
    c(37.57, 126.98),  // Seoul
    c(25.03, 121.57),  // Taipei
    c(14.60, 120.98),  // Manila
    c(13.76, 100.50),  // Bangkok
    c(21.03, 105.85),  // Hanoi
    c(10.82, 106.63),  // Ho Chi Minh City
    c(1.35, 103.82),   // Singapore
    c(3.14, 101.69),   // Kuala Lumpur
    c(-6.21, 106.85),  // Jakarta
    c(16.87, 96.20),   // Yangon
    c(47.89, 106.91),  // Ulaanbaatar
    c(43.12, 131.89),  // Vladivostok
    c(55.01, 82.93),   // Novosibirsk
    // Oceania
    c(-33.87, 151.21), // Sydney
    c(-37.81, 144.96), // Melbourne
    c(-27.47, 153.03), // Brisbane
    c(-31.95, 115.86), // Perth
    c(-34.93, 138.60), // Adelaide
    c(-36.85, 174.76), // Auckland
    c(-41.29, 174.78), // Wellington
    c(-18.14, 178.44), // Suva
    // North America
    c(40.71, -74.01),  // New York
    c(42.36, -71.06),  // Boston
    c(39.95, -75.17),  // Philadelphia
    c(38.91, -77.04),  // Washington
    c(41.88, -87.63),  // Chicago
    c(42.33, -83.05),  // Detroit
    c(33.75, -84.39),  // Atlanta
    c(25.76, -80.19),  // Miami
    c(29.76, -95.37),  // Houston
    c(32.78, -96.80),  // Dallas
    c(39.74, -104.99), // Denver
    c(33.45, -112.07), // Phoenix
    c(34.05, -118.24), // Los Angeles
    c(37.77, -122.42), // San Francisco
    c(47.61, -122.33), // Seattle
    c(43.65, -79.38),  // Toronto
    c(45.50, -73.57),  // Montreal
    c(49.28, -123.12), // Vancouver
    c(51.05, -114.07), // Calgary
    c(61.22, -149.90), // Anchorage
    c(21.31, -157.86), // Honolulu
    c(19.43, -99.13),  // Mexico City
    c(20.66, -103.35), // Guadalajara
    c(25.69, -100.32), // Monterrey
    c(23.11, -82.37),  // Havana
    c(18.47, -69.90),  // Santo Domingo
    c(9.93, -84.08),   // San Jose
    c(8.98, -79.52),   // Panama City
    // South America
    c(-23.55, -46.63), // Sao Paulo
    c(-22.91, -43.17), // Rio de Janeiro
    c(-15.79, -47.88), // Brasilia
    c(-34.60, -58.38), // Buenos Aires
    c(-33.45, -70.67), // Santiago
    c(-12.05, -77.04), // Lima
    c(4.71, -74.07),   // Bogota
    c(10.48, -66.90),  // Caracas
    c(-0.18, -78.47),  // Quito
    c(-16.49, -68.12), // La Paz
    c(-34.90, -56.16), // Montevideo
    c(-3.12, -60.02),  // Manaus
    c(-8.05, -34.88),  // Recife
    // Atlantic
    c(64.15, -21.94),  // Reykjavik
    c(38.72, -27.22),  // Azores
];

/// The built-in city set, in a fixed order.
pub fn world_cities() -> &'static [GeoCoord] {
    WORLD_CITIES
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_coordinates_are_in_range() {
        for city in world_cities() {
            assert!((-90.0..=90.0).contains(&city.latitude_deg), "{city:?}");
            assert!((-180.0..=180.0).contains(&city.longitude_deg), "{city:?}");
        }
    }

    #[test]
    fn test_no_duplicates() {
        let cities = world_cities();
        for (i, a) in cities.iter().enumerate() {
            for b in &cities[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }

    #[test]
    fn test_enough_cities_for_a_network() {
        assert!(world_cities().len() >= 100);
    }
}
