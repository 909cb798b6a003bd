//! Source text fixtures.

/// Two libraries exporting `foo` and `bar`, imported with show and hide.
pub const LIB_A: &str = "library a; fn foo; fn bar;";
pub const LIB_B: &str = "library b; fn foo; fn bar;";
pub const SHOW_HIDE_MAIN: &str = "library main; \
    import 'a.tsr' show foo; \
    import 'b.tsr' hide foo; \
    var useFoo = foo; \
    var useBar = bar;";

/// Both imports see `bar`.
pub const AMBIGUOUS_MAIN: &str = "library main; \
    import 'a.tsr'; \
    import 'b.tsr' hide foo; \
    var useBar = bar;";

/// Object, A extends Object, B extends Object, I extends Object,
/// C extends A implements I.
pub const LUB_HIERARCHY: &str = "library shapes; \
    class Object; \
    class A; \
    class B; \
    class I; \
    class C extends A implements I;";

/// A part included by two libraries.
pub const SHARED_PART: &str = "part of shared; fn helper;";
pub const FIRST_LIBRARY: &str = "library first; part 'shared.tsr'; var x = helper;";
pub const SECOND_LIBRARY: &str = "library second; part 'shared.tsr'; var y = helper;";
