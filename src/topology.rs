//! Road topology and task distribution.
//!
//! The agent only consumes the [`Topology`] and [`TaskDistribution`]
//! capabilities. [`CityMap`] is the concrete road graph used by the local
//! auction simulation: cities with planar coordinates, undirected roads
//! weighted by Euclidean length, and precomputed all-pairs shortest paths.

use crate::error::MapError;
use crate::instance::CityId;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// Distance and path queries supplied by the host platform
pub trait Topology {
    fn num_cities(&self) -> usize;

    /// Shortest road distance, symmetric and non-negative
    fn distance(&self, from: CityId, to: CityId) -> f64;

    /// Number of cities directly connected to `city`
    fn neighbor_count(&self, city: CityId) -> usize;

    /// Cities traversed when driving from `from` to `to`, excluding `from`
    /// and ending with `to`. Empty when both are the same city.
    fn path(&self, from: CityId, to: CityId) -> Vec<CityId>;

    fn cities(&self) -> Vec<CityId> {
        (0..self.num_cities()).map(CityId).collect()
    }
}

/// Probability of a task appearing between two cities
pub trait TaskDistribution {
    fn probability(&self, from: CityId, to: CityId) -> f64;
}

/// Every ordered pair of distinct cities is equally likely
#[derive(Debug, Clone, Copy)]
pub struct UniformDistribution {
    pub num_cities: usize,
}

impl UniformDistribution {
    pub fn new(num_cities: usize) -> Self {
        UniformDistribution { num_cities }
    }
}

impl TaskDistribution for UniformDistribution {
    fn probability(&self, from: CityId, to: CityId) -> f64 {
        let n = self.num_cities;
        if from == to || n < 2 || from.0 >= n || to.0 >= n {
            return 0.0;
        }
        1.0 / (n * (n - 1)) as f64
    }
}

/// A city of the road map
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct City {
    pub id: CityId,
    pub name: String,
    pub x: f64,
    pub y: f64,
}

impl City {
    pub fn new(id: usize, name: &str, x: f64, y: f64) -> Self {
        City { id: CityId(id), name: name.to_string(), x, y }
    }
}

/// Road graph with precomputed shortest paths
#[derive(Debug, Clone)]
pub struct CityMap {
    pub name: String,
    pub cities: Vec<City>,
    neighbors: Vec<Vec<CityId>>,
    distances: Vec<Vec<f64>>,
    /// `next_hop[i][j]`: first city after `i` on a shortest path to `j`
    next_hop: Vec<Vec<Option<CityId>>>,
}

impl CityMap {
    /// Build a map from its cities and undirected roads
    pub fn new(name: &str, cities: Vec<City>, roads: &[(CityId, CityId)]) -> Result<Self, MapError> {
        let n = cities.len();
        if n == 0 {
            return Err(MapError::Empty);
        }

        let mut neighbors = vec![Vec::new(); n];
        let mut distances = vec![vec![f64::INFINITY; n]; n];
        let mut next_hop = vec![vec![None; n]; n];

        for i in 0..n {
            distances[i][i] = 0.0;
        }

        for &(a, b) in roads {
            if a.0 >= n {
                return Err(MapError::UnknownCity(a.0));
            }
            if b.0 >= n {
                return Err(MapError::UnknownCity(b.0));
            }
            if a == b || neighbors[a.0].contains(&b) {
                continue;
            }
            neighbors[a.0].push(b);
            neighbors[b.0].push(a);

            let dx = cities[a.0].x - cities[b.0].x;
            let dy = cities[a.0].y - cities[b.0].y;
            let length = (dx * dx + dy * dy).sqrt();
            distances[a.0][b.0] = length;
            distances[b.0][a.0] = length;
            next_hop[a.0][b.0] = Some(b);
            next_hop[b.0][a.0] = Some(a);
        }

        // Floyd-Warshall
        for k in 0..n {
            for i in 0..n {
                if distances[i][k].is_infinite() {
                    continue;
                }
                for j in 0..n {
                    let through_k = distances[i][k] + distances[k][j];
                    if through_k < distances[i][j] {
                        distances[i][j] = through_k;
                        next_hop[i][j] = next_hop[i][k];
                    }
                }
            }
        }

        if let Some(unreachable) = (0..n).find(|&j| distances[0][j].is_infinite()) {
            return Err(MapError::Disconnected(unreachable));
        }

        Ok(CityMap {
            name: name.to_string(),
            cities,
            neighbors,
            distances,
            next_hop,
        })
    }

    /// Parse a map file.
    ///
    /// The format follows TSPLIB conventions: `NAME:` and `COMMENT:` headers,
    /// a `NODE_COORD_SECTION` of `id name x y` lines and an `EDGE_SECTION` of
    /// `id id` road lines. Ids are 1-indexed in files, 0-indexed internally.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, MapError> {
        let file = File::open(&path)?;
        Self::from_reader(BufReader::new(file))
    }

    pub fn from_reader<R: BufRead>(reader: R) -> Result<Self, MapError> {
        let mut name = String::new();
        let mut cities: Vec<City> = Vec::new();
        let mut roads: Vec<(CityId, CityId)> = Vec::new();
        let mut section = String::new();

        let parse_error = |line: usize, message: &str| MapError::Parse {
            line,
            message: message.to_string(),
        };

        for (index, line) in reader.lines().enumerate() {
            let line_no = index + 1;
            let line = line?;
            let line = line.trim();

            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            if line == "EOF" {
                break;
            }

            if let Some(rest) = line.strip_prefix("NAME:") {
                name = rest.trim().to_string();
                continue;
            }
            if line.starts_with("COMMENT:") {
                continue;
            }
            if line.starts_with("NODE_COORD_SECTION") {
                section = "coords".to_string();
                continue;
            }
            if line.starts_with("EDGE_SECTION") {
                section = "edges".to_string();
                continue;
            }

            let parts: Vec<&str> = line.split_whitespace().collect();
            match section.as_str() {
                "coords" => {
                    if parts.len() < 4 {
                        return Err(parse_error(line_no, "expected `id name x y`"));
                    }
                    let id: usize = parts[0].parse().map_err(|_| parse_error(line_no, "invalid city id"))?;
                    if id != cities.len() + 1 {
                        return Err(parse_error(line_no, "city ids must be consecutive and start at 1"));
                    }
                    let x: f64 = parts[2].parse().map_err(|_| parse_error(line_no, "invalid x coordinate"))?;
                    let y: f64 = parts[3].parse().map_err(|_| parse_error(line_no, "invalid y coordinate"))?;
                    cities.push(City::new(id - 1, parts[1], x, y));
                }
                "edges" => {
                    if parts.len() < 2 {
                        return Err(parse_error(line_no, "expected `id id`"));
                    }
                    let a: usize = parts[0].parse().map_err(|_| parse_error(line_no, "invalid city id"))?;
                    let b: usize = parts[1].parse().map_err(|_| parse_error(line_no, "invalid city id"))?;
                    if a == 0 || b == 0 {
                        return Err(parse_error(line_no, "city ids start at 1"));
                    }
                    roads.push((CityId(a - 1), CityId(b - 1)));
                }
                _ => return Err(parse_error(line_no, "data outside of a section")),
            }
        }

        Self::new(&name, cities, &roads)
    }

    pub fn city(&self, id: CityId) -> &City {
        &self.cities[id.0]
    }

    pub fn neighbors(&self, id: CityId) -> &[CityId] {
        &self.neighbors[id.0]
    }

    pub fn num_roads(&self) -> usize {
        self.neighbors.iter().map(Vec::len).sum::<usize>() / 2
    }

    /// Get statistics about the map
    pub fn statistics(&self) -> MapStatistics {
        let n = self.cities.len();
        let mut pair_distances = Vec::new();
        for i in 0..n {
            for j in i + 1..n {
                pair_distances.push(self.distances[i][j]);
            }
        }

        let avg_distance = if pair_distances.is_empty() {
            0.0
        } else {
            pair_distances.iter().sum::<f64>() / pair_distances.len() as f64
        };
        let max_distance = pair_distances.iter().cloned().fold(0.0, f64::max);
        let max_degree = self.neighbors.iter().map(Vec::len).max().unwrap_or(0);

        MapStatistics {
            name: self.name.clone(),
            num_cities: n,
            num_roads: self.num_roads(),
            max_degree,
            avg_distance,
            max_distance,
        }
    }
}

impl Topology for CityMap {
    fn num_cities(&self) -> usize {
        self.cities.len()
    }

    #[inline]
    fn distance(&self, from: CityId, to: CityId) -> f64 {
        self.distances[from.0][to.0]
    }

    fn neighbor_count(&self, city: CityId) -> usize {
        self.neighbors[city.0].len()
    }

    fn path(&self, from: CityId, to: CityId) -> Vec<CityId> {
        let mut path = Vec::new();
        let mut current = from;

        while current != to {
            match self.next_hop[current.0][to.0] {
                Some(next) => {
                    path.push(next);
                    current = next;
                }
                None => break,
            }
        }

        path
    }
}

/// Statistics about a road map
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MapStatistics {
    pub name: String,
    pub num_cities: usize,
    pub num_roads: usize,
    pub max_degree: usize,
    pub avg_distance: f64,
    pub max_distance: f64,
}

impl std::fmt::Display for MapStatistics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Map: {}", self.name)?;
        writeln!(f, "  Cities: {}", self.num_cities)?;
        writeln!(f, "  Roads: {}", self.num_roads)?;
        writeln!(f, "  Max degree: {}", self.max_degree)?;
        writeln!(f, "  Avg distance: {:.2}", self.avg_distance)?;
        writeln!(f, "  Max distance: {:.2}", self.max_distance)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square() -> CityMap {
        // 0 --- 1
        // |     |
        // 3 --- 2
        let cities = vec![
            City::new(0, "A", 0.0, 0.0),
            City::new(1, "B", 3.0, 0.0),
            City::new(2, "C", 3.0, 4.0),
            City::new(3, "D", 0.0, 4.0),
        ];
        let roads = [
            (CityId(0), CityId(1)),
            (CityId(1), CityId(2)),
            (CityId(2), CityId(3)),
            (CityId(3), CityId(0)),
        ];
        CityMap::new("square", cities, &roads).unwrap()
    }

    #[test]
    fn test_shortest_distances() {
        let map = square();
        assert!((map.distance(CityId(0), CityId(1)) - 3.0).abs() < 1e-10);
        assert!((map.distance(CityId(0), CityId(2)) - 7.0).abs() < 1e-10);
        assert!((map.distance(CityId(2), CityId(0)) - 7.0).abs() < 1e-10);
        assert_eq!(map.distance(CityId(3), CityId(3)), 0.0);
    }

    #[test]
    fn test_path_ends_at_destination() {
        let map = square();
        let path = map.path(CityId(0), CityId(2));
        assert_eq!(path.len(), 2);
        assert_eq!(path.last(), Some(&CityId(2)));
        assert!(map.path(CityId(1), CityId(1)).is_empty());

        let length: f64 = std::iter::once(CityId(0))
            .chain(path.iter().copied())
            .collect::<Vec<_>>()
            .windows(2)
            .map(|w| map.distance(w[0], w[1]))
            .sum();
        assert!((length - map.distance(CityId(0), CityId(2))).abs() < 1e-10);
    }

    #[test]
    fn test_disconnected_map_is_rejected() {
        let cities = vec![City::new(0, "A", 0.0, 0.0), City::new(1, "B", 1.0, 0.0)];
        assert!(matches!(
            CityMap::new("broken", cities, &[]),
            Err(MapError::Disconnected(1))
        ));
    }

    #[test]
    fn test_parse_map() {
        let text = "NAME: tiny\nCOMMENT: three cities\nNODE_COORD_SECTION\n1 Lausanne 0 0\n2 Bern 6 8\n3 Zurich 12 8\nEDGE_SECTION\n1 2\n2 3\nEOF\n";
        let map = CityMap::from_reader(text.as_bytes()).unwrap();

        assert_eq!(map.name, "tiny");
        assert_eq!(map.num_cities(), 3);
        assert_eq!(map.city(CityId(1)).name, "Bern");
        assert_eq!(map.neighbor_count(CityId(1)), 2);
        assert!((map.distance(CityId(0), CityId(2)) - 16.0).abs() < 1e-10);
    }

    #[test]
    fn test_parse_reports_line() {
        let text = "NODE_COORD_SECTION\n1 A 0 zero\n";
        match CityMap::from_reader(text.as_bytes()) {
            Err(MapError::Parse { line, .. }) => assert_eq!(line, 2),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_uniform_distribution() {
        let dist = UniformDistribution::new(4);
        assert_eq!(dist.probability(CityId(1), CityId(1)), 0.0);
        let total: f64 = (0..4)
            .flat_map(|i| (0..4).map(move |j| (i, j)))
            .map(|(i, j)| dist.probability(CityId(i), CityId(j)))
            .sum();
        assert!((total - 1.0).abs() < 1e-10);
    }
}
