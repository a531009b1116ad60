//! Unit definitions - prefixes, SI, derived, CGS/Gaussian units and constants
//!
//! Magnitudes use the gram as mass base, so `N = kg*m/s2` has magnitude 1e3.
//! Every derived unit keeps its defining expression; the registry tests
//! re-evaluate each one and compare it with the declared magnitude.

use crate::environment;
use crate::unit::{Definition, PrefixDef, Prefixes, UnitDef};
use crate::Dimensions;
use std::collections::HashMap;
use std::sync::LazyLock;

/// Global unit registry
pub static UNITS: LazyLock<UnitRegistry> = LazyLock::new(UnitRegistry::new);

/// Registry of all known units and prefixes
pub struct UnitRegistry {
    units: HashMap<String, UnitDef>,
    order: Vec<String>,
    prefixes: HashMap<String, PrefixDef>,
}

impl UnitRegistry {
    pub fn new() -> Self {
        let mut registry = UnitRegistry {
            units: HashMap::new(),
            order: Vec::new(),
            prefixes: HashMap::new(),
        };
        registry.register_prefixes();
        registry.register_all_units();
        registry
    }

    /// Get a unit by symbol
    pub fn get(&self, symbol: &str) -> Option<&UnitDef> {
        self.units.get(symbol)
    }

    pub fn contains(&self, symbol: &str) -> bool {
        self.units.contains_key(symbol)
    }

    pub fn prefix(&self, symbol: &str) -> Option<&PrefixDef> {
        self.prefixes.get(symbol)
    }

    /// Units in declaration order
    pub fn iter(&self) -> impl Iterator<Item = &UnitDef> {
        self.order.iter().filter_map(|s| self.units.get(s))
    }

    /// Get all units in a category
    pub fn by_category(&self, category: &str) -> Vec<&UnitDef> {
        self.iter().filter(|u| u.category == category).collect()
    }

    /// Get all unit symbols in declaration order
    pub fn symbols(&self) -> Vec<&str> {
        self.order.iter().map(|s| s.as_str()).collect()
    }

    pub fn prefix_symbols(&self) -> Vec<&str> {
        self.prefixes.keys().map(|s| s.as_str()).collect()
    }

    fn register(&mut self, unit: UnitDef) {
        if !self.units.contains_key(&unit.symbol) {
            self.order.push(unit.symbol.clone());
        }
        self.units.insert(unit.symbol.clone(), unit);
    }

    fn prefix_def(&mut self, symbol: &str, name: &str, magnitude: f64) {
        self.prefixes.insert(symbol.to_string(), PrefixDef::new(symbol, name, magnitude));
    }

    fn base(&mut self, symbol: &str, name: &str, dimensions: Dimensions, prefixes: Prefixes) {
        self.register(UnitDef::new(symbol, name, 1.0, dimensions, Definition::Base, prefixes, "base"));
    }

    #[allow(clippy::too_many_arguments)]
    fn derived(
        &mut self,
        category: &str,
        symbol: &str,
        magnitude: f64,
        dimensions: Dimensions,
        expression: &str,
        name: &str,
        prefixes: Prefixes,
    ) {
        self.register(UnitDef::new(
            symbol,
            name,
            magnitude,
            dimensions,
            Definition::Expression(expression.to_string()),
            prefixes,
            category,
        ));
    }

    fn scale(&mut self, definition: Definition, symbol: &str, dimensions: Dimensions, name: &str, prefixes: Prefixes) {
        let category = match definition {
            Definition::Temperature => "temperature",
            _ => "logarithmic",
        };
        self.register(UnitDef::new(symbol, name, 1.0, dimensions, definition, prefixes, category));
    }

    fn register_prefixes(&mut self) {
        self.prefix_def("Y", "yotta", 1e24);
        self.prefix_def("Z", "zetta", 1e21);
        self.prefix_def("E", "exa", 1e18);
        self.prefix_def("P", "peta", 1e15);
        self.prefix_def("T", "tera", 1e12);
        self.prefix_def("G", "giga", 1e9);
        self.prefix_def("M", "mega", 1e6);
        self.prefix_def("k", "kilo", 1e3);
        self.prefix_def("h", "hecto", 1e2);
        self.prefix_def("da", "deka", 1e1);
        self.prefix_def("d", "deci", 1e-1);
        self.prefix_def("c", "centi", 1e-2);
        self.prefix_def("m", "milli", 1e-3);
        self.prefix_def("u", "micro", 1e-6);
        self.prefix_def("n", "nano", 1e-9);
        self.prefix_def("p", "pico", 1e-12);
        self.prefix_def("f", "femto", 1e-15);
        self.prefix_def("a", "atto", 1e-18);
        self.prefix_def("z", "zepto", 1e-21);
        self.prefix_def("y", "yocto", 1e-24);
    }

    fn register_all_units(&mut self) {
        self.register_base_units();
        self.register_length_units();
        self.register_mass_units();
        self.register_time_units();
        self.register_temperature_units();
        self.register_angle_units();
        self.register_area_units();
        self.register_volume_units();
        self.register_mechanical_units();
        self.register_electromagnetic_units();
        self.register_cgs_units();
        self.register_derived_units();
        self.register_logarithmic_units();
        self.register_ratio_units();
        self.register_constants();
        self.register_gaussian_units();
    }

    fn register_base_units(&mut self) {
        self.base("m", "meter", Dimensions::LENGTH, Prefixes::All);
        self.base("g", "gram", Dimensions::MASS, Prefixes::All);
        self.base("s", "second", Dimensions::TIME, Prefixes::All);
        self.base("K", "Kelvin", Dimensions::TEMPERATURE, Prefixes::All);
        self.base("C", "Coulomb", Dimensions::CHARGE, Prefixes::All);
        self.base("cd", "candela", Dimensions::LUMINOSITY, Prefixes::All);
        self.base("mol", "mole", Dimensions::AMOUNT, Prefixes::All);
        self.base("rad", "radian", Dimensions::ANGLE, Prefixes::only(&["m"]));
    }

    fn register_length_units(&mut self) {
        let c = "length";
        let l = Dimensions::LENGTH;
        self.derived(c, "au", 1.49597870e11, l, "149597.870691*Mm", "astr. unit", Prefixes::None);
        self.derived(c, "AU", 1.49597870e11, l, "au", "astr. unit", Prefixes::None);
        self.derived(c, "ly", 9.460730e15, l, "[c]*yr_j", "light-year", Prefixes::only(&["k", "M", "G"]));
        self.derived(c, "pc", 3.0857e16, l, "3.0857e16*m", "parsec", Prefixes::only(&["k", "M", "G", "T"]));
        self.derived(c, "Ao", 1e-10, l, "1e-10*m", "Angstrom", Prefixes::only(&["m", "k"]));
        self.derived(c, "twip", 1.76388887e-5, l, "17.6388888*um", "US twip", Prefixes::None);
        self.derived(c, "mil", 2.53999999e-5, l, "25.4*um", "US mil", Prefixes::None);
        self.derived(c, "p", 0.000352778, l, "352.778*um", "US point", Prefixes::None);
        self.derived(c, "pi", 0.004233, l, "4.233*mm", "US pica", Prefixes::None);
        self.derived(c, "in", 0.0254, l, "25.4*mm", "US inch", Prefixes::None);
        self.derived(c, "ft", 0.3048, l, "0.3048*m", "US foot", Prefixes::None);
        self.derived(c, "yd", 0.9144, l, "0.9144*m", "US yard", Prefixes::None);
        self.derived(c, "mi", 1609.344, l, "1.609344*km", "US mile", Prefixes::None);
        self.derived(c, "le", 4828.032, l, "4.828032*km", "US league", Prefixes::None);
    }

    fn register_mass_units(&mut self) {
        let c = "mass";
        let m = Dimensions::MASS;
        self.derived(c, "u", 1.6605391e-24, m, "g/[N_0]", "atomic mass unit", Prefixes::None);
        self.derived(c, "amu", 1.6605391e-24, m, "u", "atomic mass unit", Prefixes::None);
        self.derived(c, "Da", 1.6605391e-24, m, "u", "Dalton", Prefixes::None);
        self.derived(c, "t", 1e6, m, "1e3*kg", "tonne", Prefixes::only(&["k", "m", "G"]));
        self.derived(c, "oz", 28.349523125, m, "28.349523125*g", "US ounce", Prefixes::None);
        self.derived(c, "lb", 453.59237, m, "453.59237*g", "US pound", Prefixes::None);
        self.derived(c, "ton", 907184.74, m, "907.18474*kg", "US ton", Prefixes::None);
    }

    fn register_time_units(&mut self) {
        let c = "time";
        let t = Dimensions::TIME;
        let years = || Prefixes::only(&["k", "m", "G"]);
        self.derived(c, "min", 6.0e1, t, "60*s", "minute", Prefixes::None);
        self.derived(c, "h", 3.6e3, t, "60*min", "hour", Prefixes::None);
        self.derived(c, "day", 8.64e4, t, "24*h", "day", Prefixes::None);
        self.derived(c, "yr_t", 3.1556925e7, t, "365.24219*day", "tropical year", years());
        self.derived(c, "yr_j", 3.1557600e7, t, "365.25*day", "Julian year", years());
        self.derived(c, "yr_g", 3.155695e7, t, "365.2425*day", "Gregorian year", years());
        self.derived(c, "yr", 3.155760e7, t, "yr_j", "year", years());
    }

    fn register_temperature_units(&mut self) {
        let t = Dimensions::TEMPERATURE;
        self.scale(Definition::Temperature, "Cel", t, "degree Celsius", Prefixes::None);
        self.derived("temperature", "degR", 5.0 / 9.0, t, "5/9*K", "degree Rankine", Prefixes::None);
        self.scale(Definition::Temperature, "degF", t, "degree Fahrenheit", Prefixes::None);
    }

    fn register_angle_units(&mut self) {
        let c = "angle";
        let a = Dimensions::ANGLE;
        self.derived(c, "deg", 1.7453292e-2, a, "2*[pi]*rad/360", "angle degree", Prefixes::None);
        self.derived(c, "'", 2.908882e-4, a, "deg/60", "angle minute", Prefixes::None);
        self.derived(c, "''", 4.848137e-6, a, "'/60", "angle second", Prefixes::None);
    }

    fn register_area_units(&mut self) {
        let c = "area";
        let a = Dimensions::from_ints([2, 0, 0, 0, 0, 0, 0, 0]);
        self.derived(c, "ar", 1.0e2, a, "100*m2", "are", Prefixes::only(&["c", "d", "da", "h"]));
        self.derived(c, "acre", 4046.873, a, "4046.873*m2", "US acre", Prefixes::None);
    }

    fn register_volume_units(&mut self) {
        let c = "volume";
        let v = Dimensions::from_ints([3, 0, 0, 0, 0, 0, 0, 0]);
        self.derived(c, "l", 1e-3, v, "dm3", "liter", Prefixes::All);
        self.derived(c, "L", 1e-3, v, "l", "liter", Prefixes::All);
        self.derived(c, "floz", 2.95735295e-05, v, "29.5735295625*mL", "US fluid ounce", Prefixes::None);
        self.derived(c, "pt", 4.73176473e-04, v, "473.176473*mL", "US pint", Prefixes::None);
        self.derived(c, "gal", 3.78541178e-03, v, "3.785411784*L", "US gallon", Prefixes::None);
        self.derived(c, "bbl", 0.158987294928, v, "158.987294928*L", "US barrel", Prefixes::None);
    }

    fn register_mechanical_units(&mut self) {
        let e = Dimensions::ENERGY;
        let kilo_mega = || Prefixes::only(&["k", "M"]);
        self.derived("energy", "J", 1.0e3, e, "N*m", "Joule", Prefixes::All);
        self.derived("energy", "eV", 1.602176634e-16, e, "[e]*V", "electronvolt", Prefixes::All);
        self.derived("energy", "erg", 1.0e-4, e, "dyn*cm", "erg", Prefixes::None);
        self.derived("energy", "cal", 4184.0, e, "4.184*J", "calorie", kilo_mega());
        self.derived("energy", "Cal", 4.184e6, e, "kcal", "Calorie", Prefixes::None);
        self.derived("energy", "Ha", 4.35974472e-15, e, "4.3597447222071e-18*J", "Hartree", kilo_mega());
        self.derived("energy", "E_h", 4.35974472e-15, e, "Ha", "Hartree", kilo_mega());

        let p = Dimensions::from_ints([-1, 1, -2, 0, 0, 0, 0, 0]);
        self.derived("pressure", "Pa", 1.0e3, p, "N/m2", "Pascal", Prefixes::All);
        self.derived("pressure", "atm", 1.013250e8, p, "101325*Pa", "atm. pressure", Prefixes::None);
        self.derived("pressure", "bar", 1e8, p, "100*kPa", "bar", Prefixes::only(&["m", "k"]));
        self.derived("pressure", "Ba", 1e2, p, "0.1*Pa", "Barye", Prefixes::None);

        let f = Dimensions::FORCE;
        self.derived("force", "N", 1.0e3, f, "kg*m/s2", "Newton", Prefixes::All);
        self.derived("force", "dyn", 1.0e-2, f, "g*cm/s2", "dyne", Prefixes::All);

        let dose = Dimensions::from_ints([2, 0, -2, 0, 0, 0, 0, 0]);
        self.derived("dose", "Gy", 1.0e0, dose, "J/kg", "Gray", Prefixes::None);
        self.derived("dose", "Sv", 1.0e0, dose, "J/kg", "Sivert", Prefixes::None);

        let hz = Dimensions::from_ints([0, 0, -1, 0, 0, 0, 0, 0]);
        self.derived("frequency", "Hz", 1.0e0, hz, "s-1", "Hertz", Prefixes::All);
        self.derived("frequency", "Bq", 1.0e0, hz, "s-1", "Becquerel", Prefixes::None);

        let w = Dimensions::POWER;
        self.derived("power", "W", 1.0e3, w, "J/s", "Watt", Prefixes::All);
        self.derived("power", "hp", 745700.0, w, "745.7*W", "horse power", Prefixes::None);

        let v = Dimensions::VELOCITY;
        self.derived("velocity", "mph", 0.44704, v, "0.44704*m/s", "US miles per hour", Prefixes::None);
        self.derived("velocity", "kn", 0.514444, v, "0.514444*m/s", "knot", Prefixes::None);
    }

    fn register_electromagnetic_units(&mut self) {
        let c = "electromagnetic";
        let d = Dimensions::from_ints;
        self.derived(c, "T", 1.0e3, d([0, 1, -1, 0, -1, 0, 0, 0]), "Wb/m2", "Tesla", Prefixes::All);
        self.derived(c, "G", 1.0e-1, d([0, 1, -1, 0, -1, 0, 0, 0]), "1e-4*T", "Gauss", Prefixes::All);
        self.derived(c, "Mx", 1.0e-5, d([2, 1, -1, 0, -1, 0, 0, 0]), "1e-8*Wb", "Maxwell", Prefixes::None);
        self.derived(c, "Wb", 1.0e3, d([2, 1, -1, 0, -1, 0, 0, 0]), "V*s", "Weber", Prefixes::None);
        self.derived(c, "A", 1.0e0, Dimensions::CURRENT, "C/s", "Ampere", Prefixes::All);
        self.derived(c, "H", 1.0e3, d([2, 1, 0, 0, -2, 0, 0, 0]), "Wb/A", "Henry", Prefixes::All);
        self.derived(c, "Ohm", 1.0e3, d([2, 1, -1, 0, -2, 0, 0, 0]), "V/A", "Ohm", Prefixes::All);
        self.derived(c, "V", 1.0e3, d([2, 1, -2, 0, -1, 0, 0, 0]), "J/C", "Volt", Prefixes::All);
        self.derived(c, "F", 1.0e-3, d([-2, -1, 2, 0, 2, 0, 0, 0]), "C/V", "Farad", Prefixes::All);
        self.derived(c, "S", 1.0e-3, d([-2, -1, 1, 0, 2, 0, 0, 0]), "Ohm-1", "Siemens", Prefixes::All);
    }

    fn register_cgs_units(&mut self) {
        let c = "cgs";
        let d = Dimensions::from_ints;
        self.derived(c, "P", 1.0e2, d([-1, 1, -1, 0, 0, 0, 0, 0]), "g/(cm*s)", "Poise", Prefixes::only(&["c"]));
        self.derived(c, "St", 1.0e-4, d([2, 0, -1, 0, 0, 0, 0, 0]), "cm2/s", "Stokes", Prefixes::only(&["c"]));
        self.derived(c, "Ka", 1.0e2, d([-1, 0, 0, 0, 0, 0, 0, 0]), "cm-1", "Kayser", Prefixes::None);
        self.derived(c, "D", 3.33564e-30, d([1, 0, 0, 0, 1, 0, 0, 0]), "3.33564e-30*C*m", "Debye", Prefixes::All);
        self.derived(c, "Oe", 79.57747, d([-1, 0, -1, 0, 1, 0, 0, 0]), "1e3*A/(4*[pi]*m)", "Oersted", Prefixes::None);
        self.derived(c, "Gal", 0.01, d([1, 0, -2, 0, 0, 0, 0, 0]), "cm/s2", "Gal", Prefixes::None);
        self.derived(c, "Bi", 10.0, Dimensions::CURRENT, "10*A", "Biot", Prefixes::None);
        self.derived(c, "Rad", 1e-2, d([2, 0, -2, 0, 0, 0, 0, 0]), "0.01*Gy", "radiation dose", Prefixes::None);
    }

    fn register_derived_units(&mut self) {
        let c = "derived";
        let d = Dimensions::from_ints;
        self.derived(c, "sr", 1.0, d([0, 0, 0, 0, 0, 0, 0, 2]), "rad2", "steradian", Prefixes::None);
        self.derived(c, "lm", 1.0, d([0, 0, 0, 0, 0, 1, 0, 2]), "cd*sr", "lumen", Prefixes::None);
        self.derived(c, "lx", 1.0, d([-2, 0, 0, 0, 0, 1, 0, 2]), "lm/m2", "lux", Prefixes::None);
        self.derived(c, "kat", 1.0, d([0, 0, -1, 0, 0, 0, 1, 0]), "mol/s", "katal", Prefixes::All);
    }

    fn register_logarithmic_units(&mut self) {
        let log = Definition::Logarithmic;
        let d = Dimensions::from_ints;
        let deci = || Prefixes::only(&["d"]);
        self.scale(log.clone(), "Np", Dimensions::DIMENSIONLESS, "Nepers", Prefixes::only(&["c", "d"]));
        self.scale(log.clone(), "B", Dimensions::DIMENSIONLESS, "Bel", deci());
        self.scale(log.clone(), "Bm", Dimensions::POWER, "bel-milliwatt", deci());
        self.scale(log.clone(), "BmW", Dimensions::POWER, "bel-milliwatt", deci());
        self.scale(log.clone(), "BW", Dimensions::POWER, "bel-watt", deci());
        self.scale(log.clone(), "BV", d([2, 1, -2, 0, -1, 0, 0, 0]), "bel-volt", deci());
        self.scale(log.clone(), "BuV", d([2, 1, -2, 0, -1, 0, 0, 0]), "bel-microvolt", deci());
        self.scale(log.clone(), "BA", Dimensions::CURRENT, "bel-amps", deci());
        self.scale(log.clone(), "BuA", Dimensions::CURRENT, "bel-microamps", deci());
        self.scale(log.clone(), "BOhm", d([2, 1, -1, 0, -2, 0, 0, 0]), "bel-ohms", deci());
        self.scale(log.clone(), "BSPL", d([-1, 1, -2, 0, 0, 0, 0, 0]), "bel-SPL (Pa)", deci());
        self.scale(log.clone(), "BSIL", d([0, 1, -3, 0, 0, 0, 0, 0]), "bel-SIL (W/m2)", deci());
        self.scale(log, "BSWL", Dimensions::POWER, "bel-SWL (W)", deci());
    }

    fn register_ratio_units(&mut self) {
        let c = "ratio";
        let none = Dimensions::DIMENSIONLESS;
        self.derived(c, "PR", 1.0, none, "1", "Power ratio", Prefixes::None);
        self.derived(c, "AR", 1.0, none, "1", "Amplitude ratio", Prefixes::None);
        self.derived(c, "%", 1e-2, none, "1e-2", "percent", Prefixes::None);
        self.derived(c, "ppth", 1e-3, none, "1e-3", "promile", Prefixes::None);
    }

    fn register_constants(&mut self) {
        let c = "constant";
        let d = Dimensions::from_ints;
        let none = Dimensions::DIMENSIONLESS;
        let n = || Prefixes::None;
        // dimensionless
        self.derived(c, "[alpha]", 7.29735256e-3, none, "7.29735256e-3", "fine str. const.", n());
        self.derived(c, "[euler]", std::f64::consts::E, none, "2.718282", "Euler's num.", n());
        self.derived(c, "[N_0]", 6.02214076e23, none, "6.02214076e23", "Avogadro's num.", n());
        self.derived(c, "[pi]", std::f64::consts::PI, none, "3.1415926", "pi num.", n());
        // natural constants
        self.derived(c, "[a_0]", 5.291772109e-11, Dimensions::LENGTH, "5.29177210903e-11*m", "Bohr radius", n());
        self.derived(c, "[c]", 2.99792458e8, Dimensions::VELOCITY, "299792458*m/s", "speed of light", n());
        self.derived(c, "[e]", 1.602176634e-19, Dimensions::CHARGE, "1.602176634e-19*C", "elem. charge", n());
        self.derived(c, "[eps_0]", 8.854188e-15, d([-3, -1, 2, 0, 2, 0, 0, 0]), "8.854187817e-12*F/m", "permit. of vac.", n());
        self.derived(c, "[G]", 6.672590e-14, d([3, -1, -2, 0, 0, 0, 0, 0]), "6.67259e-11*m3/(kg*s2)", "grav. const.", n());
        self.derived(c, "[g]", 9.806650e0, d([1, 0, -2, 0, 0, 0, 0, 0]), "9.80665*m/s2", "grav. accel.", n());
        self.derived(c, "[h]", 6.626076e-31, d([2, 1, -1, 0, 0, 0, 0, 0]), "6.6260755e-34*J*s", "Planck const.", n());
        self.derived(c, "[hbar]", 1.054572748e-31, d([2, 1, -1, 0, 0, 0, 0, 0]), "[h]/(2*[pi])", "Reduced Pl. con.", n());
        self.derived(c, "[H_0]", 2.197232394e-18, d([0, 0, -1, 0, 0, 0, 0, 0]), "67.8*km/(s*Mpc)", "Hubble const.", n());
        self.derived(c, "[k]", 1.380658e-20, d([2, 1, -2, -1, 0, 0, 0, 0]), "1.380658e-23*J/K", "Boltzmann const.", n());
        self.derived(c, "[k_B]", 1.380658e-20, d([2, 1, -2, -1, 0, 0, 0, 0]), "[k]", "Boltzmann const.", n());
        self.derived(c, "[k_e]", 8.9875517923e12, d([3, 1, -2, 0, -2, 0, 0, 0]), "8.9875517923e9*N*m2/C2", "Coulomb const.", n());
        self.derived(c, "[L_sol]", 3.826e29, Dimensions::POWER, "3.826e33*erg/s", "Solar luminosity", n());
        self.derived(c, "[M_sol]", 1.98847e33, Dimensions::MASS, "1.98847e30*kg", "Solar mass", n());
        self.derived(c, "[mu_0]", 1.256637e-3, d([1, 1, 0, 0, -2, 0, 0, 0]), "4*[pi]*1e-7*N/A2", "permeab. of vac.", n());
        self.derived(c, "[mu_B]", 1.67262e-24, Dimensions::MASS, "1.67262e-24*g", "Bohr magneton", n());
        self.derived(c, "[m_e]", 9.109383e-28, Dimensions::MASS, "9.1093837015e-31*kg", "electron mass", n());
        self.derived(c, "[m_p]", 1.672623e-24, Dimensions::MASS, "1.6726231e-24*g", "proton mass", n());
        self.derived(c, "[m_n]", 1.6749286e-24, Dimensions::MASS, "1.6749286e-24*g", "neutron mass", n());
        self.derived(c, "[R_inf]", 1.09737e7, d([-1, 0, 0, 0, 0, 0, 0, 0]), "1.09737e5/cm", "Rydberg constant", n());
        self.derived(c, "[R_sol]", 6.9558e8, Dimensions::LENGTH, "6.9558e10*cm", "Solar radius", n());
        self.derived(c, "[sigma]", 5.67037e-5, d([0, 1, -3, -4, 0, 0, 0, 0]), "5.67037e-8*W/(m2*K4)", "Stef.Bolt. const.", n());
        self.derived(c, "[N_A]", 6.02214076e23, d([0, 0, 0, 0, 0, 0, -1, 0]), "[N_0]/mol", "Avogadro's const.", n());
    }

    /// Gaussian based units (EMU and ESU) with half-integer exponents
    fn register_gaussian_units(&mut self) {
        let c = "gaussian";
        let h = Dimensions::from_halves;
        let n = || Prefixes::None;
        let charge = h([3, 1, -2, 0, 0, 0, 0, 0]);
        self.derived(c, "statC", 1.0e-3, charge, "dyn1:2*cm", "statcoulomb GBU", n());
        self.derived(c, "Fr", 1.0e-3, charge, "statC", "Franklin GBU", n());
        self.derived(c, "esu", 1.0e-3, charge, "statC", "el.stat. unit GBU", n());
        self.derived(c, "statA", 1.0e-3, h([3, 1, -4, 0, 0, 0, 0, 0]), "statC/s", "statampere GBU", n());
        self.derived(c, "statV", 1.0e-1, h([1, 1, -2, 0, 0, 0, 0, 0]), "erg/statC", "statvolt GBU", n());
        self.derived(c, "statG", 1.0e1, h([-1, 1, -2, 0, 0, 0, 0, 0]), "cm-1:2*g1:2/s", "Gauss GBU", n());
        self.derived(c, "statOe", 1.0e1, h([-1, 1, -2, 0, 0, 0, 0, 0]), "cm-1:2*g1:2/s", "Oersted GBU", n());
        self.derived(c, "abC", 0.1, h([1, 1, 0, 0, 0, 0, 0, 0]), "g1:2*cm1:2", "abcoulomb GBU", n());
        self.derived(c, "abA", 0.1, h([1, 1, -2, 0, 0, 0, 0, 0]), "g1:2*cm1:2/s", "abampere GBU", n());
        self.derived(c, "abBi", 0.1, h([1, 1, -2, 0, 0, 0, 0, 0]), "abA", "Biot GBU", n());
        self.derived(c, "abH", 1e-6, h([4, 2, 0, 0, -4, 0, 0, 0]), "nH", "Henry GBU", n());
        self.derived(c, "abOhm", 1e-2, h([2, 0, -2, 0, 0, 0, 0, 0]), "cm/s", "Ohm GBU", n());
        self.derived(c, "[emu_mu_B]", 9.27401007e-26, h([5, 1, -2, 0, 0, 0, 0, 0]), "9.274010078e-21*erg/statG", "Bohr magneton", n());
        self.derived(c, "[esu_mu_B]", 2.78027800e-17, h([7, 1, -4, 0, 0, 0, 0, 0]), "2.78027800e-10*statA*cm2", "Bohr magneton", n());
        self.derived(c, "[esu_e]", 4.80320427e-13, charge, "4.80320427e-10*statC", "elem. charge", n());
        self.derived(c, "[emu_e]", 1.60217663e-21, h([1, 1, 0, 0, 0, 0, 0, 0]), "1.602176634e-20*abC", "elem. charge", n());
    }
}

impl Default for UnitRegistry {
    fn default() -> Self {
        Self::new()
    }
}

// ========== Lookup including unit environments ==========

/// Unit by symbol, consulting active unit environments first
pub fn find_unit(symbol: &str) -> Option<UnitDef> {
    environment::custom_unit(symbol).or_else(|| UNITS.get(symbol).cloned())
}

/// Longest known unit symbol that `text` ends with
pub fn match_suffix(text: &str) -> Option<String> {
    let custom = environment::custom_symbols();
    UNITS
        .symbols()
        .into_iter()
        .map(str::to_string)
        .chain(custom)
        .filter(|symbol| text.ends_with(symbol.as_str()))
        .max_by_key(|symbol| symbol.len())
}
